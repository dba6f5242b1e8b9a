//! Shared error definitions and the callback normalizer used across beacon crates.

pub mod callback;
pub mod error;

pub use {
    callback::{Callback, CallbackFuture},
    error::{Error, FromMessage, Result},
};
