//! JSON file-backed store with atomic writes.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    serde_json::{Map, Value},
    tokio::{fs, sync::Mutex},
    tracing::{debug, warn},
};

use crate::{Error, Result, store::KeyValueStore, store::UpdateFn};

type Entries = Map<String, Value>;

/// File-backed store. All keys live in one JSON object.
///
/// The file is read once on first access and cached; every mutation rewrites
/// it while the cache lock is held, so writes from one process never
/// interleave.
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<Option<Entries>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Entries> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "state file missing, starting empty");
            return Ok(Entries::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(Entries::new());
        }
        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(Error::corrupt(&self.path, "top-level value is not an object")),
            Err(e) => Err(Error::corrupt(&self.path, e)),
        }
    }

    /// Atomic write: write to temp, keep `.bak` of the previous file, rename over target.
    async fn atomic_write(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.path, &bak).await {
                warn!(path = %bak.display(), error = %e, "failed to refresh state backup");
            }
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Run `f` against the cached entries, persisting when it reports a change.
    ///
    /// If the write fails the cache is dropped so the next access reloads
    /// whatever actually reached the disk.
    async fn with_entries<R>(&self, f: impl FnOnce(&mut Entries) -> (R, bool)) -> Result<R> {
        let mut cache = self.cache.lock().await;
        let mut entries = match cache.take() {
            Some(entries) => entries,
            None => self.read_entries().await?,
        };

        let (out, changed) = f(&mut entries);
        if changed {
            self.atomic_write(&entries).await?;
        }
        *cache = Some(entries);
        Ok(out)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.with_entries(|entries| (entries.get(key).cloned(), false))
            .await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.with_entries(|entries| {
            let existed = entries.remove(key).is_some();
            (existed, existed)
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.with_entries(|entries| (entries.keys().cloned().collect(), false))
            .await
    }

    async fn update(&self, key: &str, f: UpdateFn) -> Result<Value> {
        self.with_entries(|entries| match f(entries.get(key).cloned()) {
            Ok(next) => {
                entries.insert(key.to_string(), next.clone());
                (Ok(next), true)
            },
            Err(e) => (Err(e), false),
        })
        .await?
    }
}
