//! In-memory store for testing and embedding.

use std::{collections::HashMap, sync::Mutex};

use {async_trait::async_trait, serde_json::Value};

use crate::{Result, store::KeyValueStore, store::UpdateFn};

/// In-memory store backed by `HashMap`. Nothing survives the process.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a store with existing entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn update(&self, key: &str, f: UpdateFn) -> Result<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let next = f(entries.get(key).cloned())?;
        entries.insert(key.to_string(), next.clone());
        Ok(next)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::KeyValueStoreExt, rstest::rstest, serde_json::json};

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStore::new();
        store.set("senderId", json!("X")).await.unwrap();
        assert_eq!(store.get("senderId").await.unwrap(), Some(json!("X")));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryStore::new();
        assert!(store.get("credentials").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::with_entries([("k".to_string(), json!(1))]);
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let store = InMemoryStore::new();
        store.set("senderId", json!("X")).await.unwrap();
        store.set("credentials", json!({})).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["credentials", "senderId"]);
    }

    #[rstest]
    #[case::absent(None, json!(["m1"]))]
    #[case::existing(Some(json!(["m0"])), json!(["m0", "m1"]))]
    #[tokio::test]
    async fn test_update_appends(#[case] initial: Option<Value>, #[case] expected: Value) {
        let store = InMemoryStore::new();
        if let Some(initial) = initial {
            store.set("persistentIds", initial).await.unwrap();
        }
        let stored = store
            .update(
                "persistentIds",
                Box::new(|current| {
                    let mut ids = match current {
                        Some(Value::Array(ids)) => ids,
                        _ => Vec::new(),
                    };
                    ids.push(json!("m1"));
                    Ok(Value::Array(ids))
                }),
            )
            .await
            .unwrap();
        assert_eq!(stored, expected);
        assert_eq!(store.get("persistentIds").await.unwrap(), Some(expected));
    }

    #[tokio::test]
    async fn test_typed_accessors() {
        let store = InMemoryStore::new();
        store
            .set_as("persistentIds", &vec!["a".to_string()])
            .await
            .unwrap();
        let ids: Option<Vec<String>> = store.get_as("persistentIds").await.unwrap();
        assert_eq!(ids, Some(vec!["a".to_string()]));

        store.set("senderId", json!(42)).await.unwrap();
        let wrong: Result<Option<String>> = store.get_as("senderId").await;
        assert!(wrong.is_err());
    }
}
