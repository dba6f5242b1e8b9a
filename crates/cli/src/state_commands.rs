use std::path::Path;

use {
    anyhow::Result,
    beacon_config::BeaconConfig,
    beacon_receiver::{PersistedState, state},
    beacon_store::{FileStore, KeyValueStore},
    clap::Subcommand,
    serde::Serialize,
    tracing::info,
};

#[derive(Subcommand)]
pub enum StateAction {
    /// Show the persisted sender id, token and ledger size.
    Show {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print every delivered message id, oldest first.
    Ids,
    /// Forget the registration so the next start registers again.
    Reset {
        /// Also wipe the delivered-id ledger.
        #[arg(long)]
        all: bool,
    },
}

pub async fn handle_state(action: StateAction, config: &BeaconConfig) -> Result<()> {
    let path = config.store.resolved_path();
    let store = FileStore::new(&path);

    match action {
        StateAction::Show { json } => {
            let summary = StateSummary::load(&store, &path, config.sender_id.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print();
            }
        },
        StateAction::Ids => {
            for id in state::load_persistent_ids(&store).await? {
                println!("{id}");
            }
        },
        StateAction::Reset { all } => reset(&store, &path, all).await?,
    }

    Ok(())
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateSummary {
    path: String,
    sender_id: Option<String>,
    token: Option<String>,
    registered: bool,
    persistent_ids: usize,
    /// Sender id from config or `BEACON_SENDER_ID`.
    #[serde(skip_serializing_if = "Option::is_none")]
    configured_sender_id: Option<String>,
    /// Whether a start with the configured sender reuses the persisted
    /// credentials. `None` when no sender is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    reusable: Option<bool>,
}

impl StateSummary {
    async fn load(
        store: &dyn KeyValueStore,
        path: &Path,
        configured_sender_id: Option<&str>,
    ) -> Result<Self> {
        let persisted = PersistedState::load(store).await?;
        let reusable =
            configured_sender_id.map(|sender| persisted.reusable_credentials(sender).is_some());
        Ok(Self {
            path: path.display().to_string(),
            token: persisted.token().map(str::to_owned),
            registered: persisted.credentials.is_some(),
            sender_id: persisted.sender_id,
            persistent_ids: persisted.persistent_ids.len(),
            configured_sender_id: configured_sender_id.map(str::to_owned),
            reusable,
        })
    }

    fn print(&self) {
        println!("State file:     {}", self.path);
        println!(
            "Sender id:      {}",
            self.sender_id.as_deref().unwrap_or("(none)")
        );
        println!("Registered:     {}", if self.registered { "yes" } else { "no" });
        println!("Token:          {}", self.token.as_deref().unwrap_or("(none)"));
        println!("Delivered ids:  {}", self.persistent_ids);
        if let (Some(sender), Some(reusable)) = (&self.configured_sender_id, self.reusable) {
            let verdict = if reusable {
                "reuses persisted credentials"
            } else {
                "will register again"
            };
            println!("Config sender:  {sender} ({verdict})");
        }
    }
}

async fn reset(store: &dyn KeyValueStore, path: &Path, all: bool) -> Result<()> {
    if all {
        state::clear_all(store).await?;
        info!(path = %path.display(), "cleared receiver state");
        println!("Cleared registration and delivered-id ledger.");
        return Ok(());
    }

    if state::clear_registration(store).await? {
        info!(path = %path.display(), "cleared registration");
        println!("Registration cleared. The next start will register again.");
    } else {
        println!("No registration found.");
    }
    Ok(())
}
