//! Per-message handler installed on the listen session.

use std::sync::Arc;

use {
    async_trait::async_trait,
    beacon_service_traits::{InboundMessage, MessageHandler, ServiceError, ServiceResult},
    beacon_store::KeyValueStore,
    tokio::sync::Mutex,
    tracing::{debug, error, warn},
};

use crate::{callbacks::Callbacks, state};

/// Records each delivered id in the ledger, then forwards the payload.
///
/// The id is durable before the host sees the payload, so the only window in
/// which a restart can redeliver is a crash between delivery and the ledger
/// write. Deliveries are handled one at a time.
pub struct NotificationRelay {
    store: Arc<dyn KeyValueStore>,
    callbacks: Callbacks,
    turn: Mutex<()>,
}

impl NotificationRelay {
    pub fn new(store: Arc<dyn KeyValueStore>, callbacks: Callbacks) -> Self {
        Self {
            store,
            callbacks,
            turn: Mutex::new(()),
        }
    }
}

#[async_trait]
impl MessageHandler for NotificationRelay {
    async fn on_message(&self, message: InboundMessage) -> ServiceResult {
        let _turn = self.turn.lock().await;
        let InboundMessage {
            notification,
            persistent_id,
        } = message;

        let ledger_len =
            match state::append_persistent_id(self.store.as_ref(), &persistent_id).await {
                Ok(len) => len,
                Err(e) => {
                    error!(persistent_id = %persistent_id, error = %e, "failed to record delivered message");
                    let message = format!("failed to record message {persistent_id}: {e}");
                    self.callbacks.emit_error(message.clone()).await;
                    return Err(ServiceError::message(message));
                },
            };
        debug!(persistent_id = %persistent_id, ledger_len, "notification received");

        if let Err(e) = self.callbacks.emit_notification(notification).await {
            warn!(persistent_id = %persistent_id, error = %e, "notification callback failed");
            self.callbacks.emit_error(e.to_string()).await;
        }
        Ok(())
    }
}
