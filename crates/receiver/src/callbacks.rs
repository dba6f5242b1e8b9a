//! Host callback slots.
//!
//! Slots can be replaced at any time. Dispatch clones the callback currently
//! in the slot and releases the lock before awaiting it, so a callback may
//! itself swap callbacks without deadlocking.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use {
    beacon_common::{Callback, Error, Result},
    serde_json::Value,
    tracing::warn,
};

/// The four optional host callbacks.
#[derive(Debug, Clone, Default)]
pub struct CallbackSet {
    /// Listen session established (or start re-invoked); receives the token.
    pub on_started: Option<Callback<Option<String>>>,
    /// Start failed or a delivery could not be handled.
    pub on_error: Option<Callback<String>>,
    /// A new notification payload arrived.
    pub on_notification: Option<Callback<Value>>,
    /// A fresh registration produced a new token.
    pub on_token_updated: Option<Callback<String>>,
}

/// Shared handle to a [`CallbackSet`].
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    slots: Arc<RwLock<CallbackSet>>,
}

impl Callbacks {
    pub fn set_on_started(&self, callback: Callback<Option<String>>) {
        self.write().on_started = Some(callback);
    }

    pub fn set_on_error(&self, callback: Callback<String>) {
        self.write().on_error = Some(callback);
    }

    pub fn set_on_notification(&self, callback: Callback<Value>) {
        self.write().on_notification = Some(callback);
    }

    pub fn set_on_token_updated(&self, callback: Callback<String>) {
        self.write().on_token_updated = Some(callback);
    }

    /// Snapshot of the callbacks currently installed.
    pub fn snapshot(&self) -> CallbackSet {
        self.read().clone()
    }

    pub(crate) async fn emit_started(&self, token: Option<String>) -> Result<()> {
        let slot = self.read().on_started.clone();
        let Some(cb) = slot else {
            return Ok(());
        };
        cb.invoke(token)
            .await
            .map_err(|e| Error::callback("on-started", &e))
    }

    pub(crate) async fn emit_token_updated(&self, token: String) -> Result<()> {
        let slot = self.read().on_token_updated.clone();
        let Some(cb) = slot else {
            return Ok(());
        };
        cb.invoke(token)
            .await
            .map_err(|e| Error::callback("on-token-updated", &e))
    }

    pub(crate) async fn emit_notification(&self, payload: Value) -> Result<()> {
        let slot = self.read().on_notification.clone();
        let Some(cb) = slot else {
            return Ok(());
        };
        cb.invoke(payload)
            .await
            .map_err(|e| Error::callback("on-notification", &e))
    }

    /// Report an error to the host. Failures of the error callback itself
    /// are only logged.
    pub(crate) async fn emit_error(&self, message: String) {
        let slot = self.read().on_error.clone();
        let Some(cb) = slot else {
            return;
        };
        if let Err(e) = cb.invoke(message).await {
            warn!(error = %format!("{e:#}"), "on-error callback failed");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CallbackSet> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CallbackSet> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }
}
