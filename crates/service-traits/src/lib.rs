//! Seam traits for the push-messaging collaborators.
//!
//! The registration handshake and the long-lived listen connection are owned
//! by an external provider; the receiver only talks to them through the
//! traits here. Each trait has a `Noop` implementation that fails with a
//! "not configured" error so the receiver can be wired up before a real
//! provider is available.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tokio_util::sync::CancellationToken,
    tracing::warn,
};

/// Error type returned by provider and handler calls.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T = ()> = Result<T, ServiceError>;

// ── Wire types ──────────────────────────────────────────────────────────────

/// Long-lived credentials returned by a registration.
///
/// The receiver treats the record as opaque apart from the messaging token
/// at `fcm.token`; everything else is provider-internal and round-tripped
/// untouched through the persistent store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    /// Build credentials from a JSON value. Only objects are accepted.
    pub fn from_value(value: Value) -> ServiceResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ServiceError::message(format!(
                "credentials must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The messaging token handed to the host application.
    pub fn token(&self) -> Option<&str> {
        self.0.get("fcm")?.get("token")?.as_str()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Credentials merged with the already-delivered persistent ids.
///
/// Serializes flat: `{ ...credentials, "persistentIds": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenCredentials {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(rename = "persistentIds", default)]
    pub persistent_ids: Vec<String>,
}

impl ListenCredentials {
    #[must_use]
    pub fn new(credentials: Credentials, persistent_ids: Vec<String>) -> Self {
        Self {
            credentials,
            persistent_ids,
        }
    }

    /// Whether a message id was already delivered before this session.
    pub fn has_seen(&self, persistent_id: &str) -> bool {
        self.persistent_ids.iter().any(|id| id == persistent_id)
    }
}

/// One message delivered on a listen session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Provider payload forwarded to the host untouched.
    pub notification: Value,
    /// Provider-assigned id used for redelivery suppression.
    pub persistent_id: String,
}

// ── Traits ──────────────────────────────────────────────────────────────────

/// Per-message sink handed to a [`Listener`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: InboundMessage) -> ServiceResult;
}

/// Performs the one-time registration with the messaging backend.
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, sender_id: &str) -> ServiceResult<Credentials>;
}

/// Opens the long-lived listen connection.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Connect using `credentials` and deliver every new message to `handler`.
    ///
    /// Resolves as soon as the connection is established. Delivery and
    /// reconnection continue in the background until `shutdown` is
    /// cancelled. Messages whose id appears in
    /// [`ListenCredentials::persistent_ids`] must not be delivered again.
    async fn listen(
        &self,
        credentials: ListenCredentials,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> ServiceResult;
}

// ── Noop implementations ────────────────────────────────────────────────────

pub struct NoopRegistrar;

#[async_trait]
impl Registrar for NoopRegistrar {
    async fn register(&self, sender_id: &str) -> ServiceResult<Credentials> {
        warn!(sender_id, "registration requested but no provider is configured");
        Err("registration provider not configured".into())
    }
}

pub struct NoopListener;

#[async_trait]
impl Listener for NoopListener {
    async fn listen(
        &self,
        _credentials: ListenCredentials,
        _handler: Arc<dyn MessageHandler>,
        _shutdown: CancellationToken,
    ) -> ServiceResult {
        warn!("listen requested but no provider is configured");
        Err("listening provider not configured".into())
    }
}
