mod config_commands;
mod state_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    beacon_config::BeaconConfig,
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "beacon", about = "Beacon - push-notification receiver state tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Load this config file instead of searching the standard locations.
    #[arg(long, global = true, env = "BEACON_CONFIG")]
    config: Option<PathBuf>,

    /// State file to operate on (overrides config value).
    #[arg(long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or reset persisted receiver state.
    State {
        #[command(subcommand)]
        action: state_commands::StateAction,
    },
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<BeaconConfig> {
    let mut config = match &cli.config {
        Some(path) => beacon_config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => beacon_config::discover_and_load(),
    };
    beacon_config::apply_env_overrides(&mut config);
    if let Some(path) = &cli.store {
        config.store.path = Some(path.clone());
    }
    Ok(config)
}

fn init_telemetry(cli: &Cli, config: &BeaconConfig) {
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs || config.logging.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_telemetry(&cli, &config);
    debug!(version = env!("CARGO_PKG_VERSION"), "beacon starting");

    match cli.command {
        Commands::State { action } => state_commands::handle_state(action, &config).await,
        Commands::Config { action } => config_commands::handle_config(action, &config),
    }
}
