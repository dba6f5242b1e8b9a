use {beacon_service_traits::ServiceError, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("registration failed: {0}")]
    Registration(#[source] ServiceError),

    #[error("listen failed: {0}")]
    Listen(#[source] ServiceError),

    #[error("state store failure: {0}")]
    Store(#[from] beacon_store::Error),

    #[error("registration returned credentials without an fcm token")]
    MissingToken,

    #[error(transparent)]
    Callback(#[from] beacon_common::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
