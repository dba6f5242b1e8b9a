//! Push-notification receiver lifecycle.
//!
//! [`NotificationService`] registers with the messaging provider at most once
//! per sender id, opens a single listen session per process, and keeps a
//! durable ledger of delivered message ids so restarts never surface the same
//! notification twice. Host code observes the lifecycle through late-bound
//! [`Callbacks`].

pub mod callbacks;
pub mod error;
pub mod relay;
pub mod service;
pub mod state;

pub use {
    beacon_common::Callback,
    beacon_service_traits::{
        Credentials, InboundMessage, ListenCredentials, Listener, MessageHandler, Registrar,
    },
    callbacks::{CallbackSet, Callbacks},
    error::{Error, Result},
    relay::NotificationRelay,
    service::{NotificationService, ServiceState},
    state::PersistedState,
};
