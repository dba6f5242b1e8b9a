//! Persisted receiver state: credentials, sender id and the delivered-id ledger.
//!
//! Keys in the store:
//! - `credentials`: opaque provider credentials
//! - `senderId`: sender the credentials were registered for
//! - `persistentIds`: every message id already handed to the host

use {
    beacon_service_traits::Credentials,
    beacon_store::{KeyValueStore, KeyValueStoreExt},
    serde::de::DeserializeOwned,
    serde_json::Value,
};

use crate::Result;

pub const CREDENTIALS_KEY: &str = "credentials";
pub const SENDER_ID_KEY: &str = "senderId";
pub const PERSISTENT_IDS_KEY: &str = "persistentIds";

/// Snapshot of everything the lifecycle reads at start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub credentials: Option<Credentials>,
    pub sender_id: Option<String>,
    pub persistent_ids: Vec<String>,
}

impl PersistedState {
    /// Read all three keys. Missing keys are not an error.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(Self {
            credentials: load_credentials(store).await?,
            sender_id: get_present(store, SENDER_ID_KEY).await?,
            persistent_ids: load_persistent_ids(store).await?,
        })
    }

    /// The persisted credentials, if they were registered for `sender_id`.
    ///
    /// `None` means a fresh registration is required: nothing is persisted,
    /// or the credentials belong to another sender. Sender ids must match
    /// exactly.
    pub fn reusable_credentials(&self, sender_id: &str) -> Option<&Credentials> {
        self.credentials
            .as_ref()
            .filter(|_| self.sender_id.as_deref() == Some(sender_id))
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().and_then(Credentials::token)
    }
}

/// Read a key, treating JSON `null` the same as an absent key.
async fn get_present<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    Ok(store.get_as::<Option<T>>(key).await?.flatten())
}

pub async fn load_credentials(store: &dyn KeyValueStore) -> Result<Option<Credentials>> {
    get_present(store, CREDENTIALS_KEY).await
}

pub async fn load_persistent_ids(store: &dyn KeyValueStore) -> Result<Vec<String>> {
    Ok(get_present(store, PERSISTENT_IDS_KEY)
        .await?
        .unwrap_or_default())
}

/// Persist a fresh registration. Credentials are written before the sender
/// id, since the sender id is what gates future registration decisions.
pub async fn save_registration(
    store: &dyn KeyValueStore,
    credentials: &Credentials,
    sender_id: &str,
) -> Result<()> {
    store.set_as(CREDENTIALS_KEY, credentials).await?;
    store
        .set(SENDER_ID_KEY, Value::String(sender_id.to_string()))
        .await?;
    Ok(())
}

/// Append one id to the ledger. Returns the ledger length afterwards.
///
/// A ledger that is not an array is left as-is and reported as a store
/// error; resetting it would forget which messages were delivered.
pub async fn append_persistent_id(store: &dyn KeyValueStore, persistent_id: &str) -> Result<usize> {
    let id = Value::String(persistent_id.to_string());
    let stored = store
        .update(
            PERSISTENT_IDS_KEY,
            Box::new(move |current: Option<Value>| {
                let mut ids = match current {
                    Some(Value::Array(ids)) => ids,
                    None | Some(Value::Null) => Vec::new(),
                    Some(other) => {
                        return Err(beacon_store::Error::message(format!(
                            "`{PERSISTENT_IDS_KEY}` is not an array: {other}"
                        )));
                    },
                };
                ids.push(id);
                Ok(Value::Array(ids))
            }),
        )
        .await?;
    Ok(stored.as_array().map_or(0, Vec::len))
}

/// Forget credentials and sender id so the next start registers again.
/// The ledger is kept. Returns whether anything was removed.
pub async fn clear_registration(store: &dyn KeyValueStore) -> Result<bool> {
    let had_credentials = store.delete(CREDENTIALS_KEY).await?;
    let had_sender = store.delete(SENDER_ID_KEY).await?;
    Ok(had_credentials || had_sender)
}

/// Forget everything, including the ledger.
pub async fn clear_all(store: &dyn KeyValueStore) -> Result<()> {
    clear_registration(store).await?;
    store.delete(PERSISTENT_IDS_KEY).await?;
    Ok(())
}
