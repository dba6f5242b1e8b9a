//! Persistence trait for receiver state.

use {
    async_trait::async_trait,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::{Result, error::Context};

/// Read-modify-write step applied by [`KeyValueStore::update`].
///
/// Receives the current value (or `None` when the key is absent) and returns
/// the value to store. An error leaves the key untouched.
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Result<Value> + Send>;

/// String-keyed store of JSON values that survives process restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn keys(&self) -> Result<Vec<String>>;
    /// Apply `f` to the current value of `key` and store the result.
    ///
    /// No other operation on the same store observes or interleaves with the
    /// read and the write. Returns the stored value.
    async fn update(&self, key: &str, f: UpdateFn) -> Result<Value>;
}

/// Typed accessors on top of [`KeyValueStore`].
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("decoding `{key}`"))
                .map(Some),
            None => Ok(None),
        }
    }

    async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(key, value).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}
