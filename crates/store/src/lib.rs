//! Durable key-value storage for receiver state.
//!
//! Values are arbitrary JSON. The default backend keeps every key in a single
//! JSON object file (`push-receiver.json`) rewritten atomically on each change.

pub mod error;
pub mod store;
pub mod store_file;
pub mod store_memory;

pub use {
    error::{Error, Result},
    store::{KeyValueStore, KeyValueStoreExt, UpdateFn},
    store_file::FileStore,
    store_memory::InMemoryStore,
};
