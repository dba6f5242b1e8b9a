//! Notification service lifecycle: registration reuse, single listen session,
//! start idempotence, stop.

use std::sync::{Arc, Mutex, MutexGuard};

use {
    beacon_common::Callback,
    beacon_service_traits::{Credentials, ListenCredentials, Listener, MessageHandler, Registrar},
    beacon_store::KeyValueStore,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    callbacks::Callbacks,
    relay::NotificationRelay,
    state::{self, PersistedState},
};

/// Where the service is in its lifecycle.
///
/// `Starting` is entered by the first `start` call and left only by a
/// successful listen (`Running`) or by [`NotificationService::stop`]. A
/// failed start stays in `Starting`: later `start` calls will not retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Starting,
    Running,
}

struct Lifecycle {
    state: ServiceState,
    /// Bumped by every stop so an in-flight start can tell it was cancelled.
    generation: u64,
    session: Option<CancellationToken>,
}

/// Receives push notifications for one host application.
///
/// Construct one per process and share it by `Arc`.
pub struct NotificationService {
    store: Arc<dyn KeyValueStore>,
    registrar: Arc<dyn Registrar>,
    listener: Arc<dyn Listener>,
    callbacks: Callbacks,
    relay: Arc<NotificationRelay>,
    lifecycle: Mutex<Lifecycle>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        registrar: Arc<dyn Registrar>,
        listener: Arc<dyn Listener>,
    ) -> Arc<Self> {
        Self::with_callbacks(store, registrar, listener, Callbacks::default())
    }

    /// Create a service sharing an existing callback handle.
    pub fn with_callbacks(
        store: Arc<dyn KeyValueStore>,
        registrar: Arc<dyn Registrar>,
        listener: Arc<dyn Listener>,
        callbacks: Callbacks,
    ) -> Arc<Self> {
        let relay = Arc::new(NotificationRelay::new(
            Arc::clone(&store),
            callbacks.clone(),
        ));
        Arc::new(Self {
            store,
            registrar,
            listener,
            callbacks,
            relay,
            lifecycle: Mutex::new(Lifecycle {
                state: ServiceState::NotStarted,
                generation: 0,
                session: None,
            }),
        })
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn set_started_callback(&self, callback: Callback<Option<String>>) {
        self.callbacks.set_on_started(callback);
    }

    pub fn set_error_callback(&self, callback: Callback<String>) {
        self.callbacks.set_on_error(callback);
    }

    pub fn set_notification_callback(&self, callback: Callback<Value>) {
        self.callbacks.set_on_notification(callback);
    }

    pub fn set_token_updated_callback(&self, callback: Callback<String>) {
        self.callbacks.set_on_token_updated(callback);
    }

    pub fn state(&self) -> ServiceState {
        self.lifecycle().state
    }

    /// Token of the persisted credentials, if any.
    pub async fn token(&self) -> Result<Option<String>> {
        let credentials = state::load_credentials(self.store.as_ref()).await?;
        Ok(credentials.and_then(|c| c.token().map(str::to_owned)))
    }

    /// Every message id delivered so far, oldest first.
    pub async fn persistent_ids(&self) -> Result<Vec<String>> {
        state::load_persistent_ids(self.store.as_ref()).await
    }

    /// Start receiving notifications for `sender_id`.
    ///
    /// Only the first call does any work. Later calls just report the current
    /// token through the on-started callback. Never fails: errors are logged
    /// and passed to the on-error callback.
    pub async fn start(&self, sender_id: &str) {
        let generation = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state == ServiceState::NotStarted {
                lifecycle.state = ServiceState::Starting;
                Some(lifecycle.generation)
            } else {
                None
            }
        };

        let Some(generation) = generation else {
            debug!(sender_id, "notification service already started");
            self.report_current_token().await;
            return;
        };

        info!(sender_id, "starting notification service");
        if let Err(e) = self.run_start(sender_id, generation).await {
            error!(sender_id, error = %e, "error while starting the notification service");
            self.callbacks.emit_error(e.to_string()).await;
        }
    }

    /// Close the listen session and return to `NotStarted`.
    ///
    /// Returns whether a session was open. A start still in flight finishes
    /// its listen call, then closes that session without reporting started.
    pub fn stop(&self) -> bool {
        let session = {
            let mut lifecycle = self.lifecycle();
            lifecycle.state = ServiceState::NotStarted;
            lifecycle.generation += 1;
            lifecycle.session.take()
        };

        match session {
            Some(session) => {
                session.cancel();
                info!("notification service stopped");
                true
            },
            None => false,
        }
    }

    async fn run_start(&self, sender_id: &str, generation: u64) -> Result<()> {
        let persisted = PersistedState::load(self.store.as_ref()).await?;

        let credentials = match persisted.reusable_credentials(sender_id) {
            Some(credentials) => {
                debug!(sender_id, "reusing persisted credentials");
                credentials.clone()
            },
            None => match self.register(sender_id, generation).await? {
                Some(credentials) => credentials,
                None => return Ok(()),
            },
        };

        let token = credentials.token().map(str::to_owned);
        let seen = persisted.persistent_ids.len();
        let session = CancellationToken::new();
        let handler: Arc<dyn MessageHandler> = self.relay.clone();
        self.listener
            .listen(
                ListenCredentials::new(credentials, persisted.persistent_ids),
                handler,
                session.clone(),
            )
            .await
            .map_err(Error::Listen)?;

        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.generation != generation {
                drop(lifecycle);
                session.cancel();
                info!(sender_id, "stopped while starting, closing listen session");
                return Ok(());
            }
            lifecycle.state = ServiceState::Running;
            lifecycle.session = Some(session);
        }
        info!(sender_id, seen, "listening for push notifications");

        self.callbacks.emit_started(token).await?;
        Ok(())
    }

    /// Register and persist fresh credentials.
    ///
    /// Returns `None` when the service was stopped while the registrar was
    /// running; the credentials are then dropped without being persisted or
    /// reported, since a newer start may already own the store.
    async fn register(&self, sender_id: &str, generation: u64) -> Result<Option<Credentials>> {
        info!(sender_id, "registering with messaging provider");
        let credentials = self
            .registrar
            .register(sender_id)
            .await
            .map_err(Error::Registration)?;
        let token = credentials.token().ok_or(Error::MissingToken)?.to_owned();

        if !self.is_current(generation) {
            info!(sender_id, "stopped while registering, discarding credentials");
            return Ok(None);
        }
        state::save_registration(self.store.as_ref(), &credentials, sender_id).await?;
        self.callbacks.emit_token_updated(token).await?;
        Ok(Some(credentials))
    }

    async fn report_current_token(&self) {
        let token = match self.token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to read persisted credentials");
                None
            },
        };
        if let Err(e) = self.callbacks.emit_started(token).await {
            warn!(error = %e, "started callback failed");
            self.callbacks.emit_error(e.to_string()).await;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lifecycle().generation == generation
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        beacon_service_traits::{NoopListener, NoopRegistrar, ServiceResult},
        beacon_store::InMemoryStore,
        serde_json::json,
        std::sync::Mutex as StdMutex,
    };

    struct FixedRegistrar;

    #[async_trait]
    impl Registrar for FixedRegistrar {
        async fn register(&self, _sender_id: &str) -> ServiceResult<Credentials> {
            Ok(Credentials::from_value(json!({ "fcm": { "token": "T1" } }))?)
        }
    }

    struct ImmediateListener;

    #[async_trait]
    impl Listener for ImmediateListener {
        async fn listen(
            &self,
            _credentials: ListenCredentials,
            _handler: Arc<dyn MessageHandler>,
            _shutdown: CancellationToken,
        ) -> ServiceResult {
            Ok(())
        }
    }

    fn errors_of(svc: &NotificationService) -> Arc<StdMutex<Vec<String>>> {
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let log = Arc::clone(&errors);
        svc.set_error_callback(Callback::from_fn(move |msg: String| {
            log.lock().unwrap().push(msg);
            Ok(())
        }));
        errors
    }

    #[tokio::test]
    async fn start_moves_to_running() {
        let svc = NotificationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedRegistrar),
            Arc::new(ImmediateListener),
        );
        assert_eq!(svc.state(), ServiceState::NotStarted);
        svc.start("X").await;
        assert_eq!(svc.state(), ServiceState::Running);
        assert_eq!(svc.token().await.unwrap().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn unconfigured_providers_report_error_and_stay_starting() {
        let svc = NotificationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(NoopRegistrar),
            Arc::new(NoopListener),
        );
        let errors = errors_of(&svc);

        svc.start("X").await;

        assert_eq!(svc.state(), ServiceState::Starting);
        assert_eq!(
            *errors.lock().unwrap(),
            vec!["registration failed: registration provider not configured"]
        );
    }

    #[tokio::test]
    async fn listen_failure_is_reported() {
        let svc = NotificationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedRegistrar),
            Arc::new(NoopListener),
        );
        let errors = errors_of(&svc);

        svc.start("X").await;

        assert_eq!(
            *errors.lock().unwrap(),
            vec!["listen failed: listening provider not configured"]
        );
        // Registration succeeded before the listen failed, so it is kept.
        assert_eq!(svc.token().await.unwrap().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn stop_without_session() {
        let svc = NotificationService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedRegistrar),
            Arc::new(ImmediateListener),
        );
        assert!(!svc.stop());
        assert_eq!(svc.state(), ServiceState::NotStarted);

        svc.start("X").await;
        assert!(svc.stop());
        assert!(!svc.stop());
    }
}
