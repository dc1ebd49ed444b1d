//! JSON file-backed key/value store.
//!
//! All slots live in one JSON object written atomically (temporary file plus
//! rename) inside a capability-scoped directory. Keys this crate does not
//! know about are preserved across writes.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde_json::{Map, Value};
use std::io;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::task::ports::{
    KeyValueStore, StoreChange, StoreEntries, StoreError, StoreKey, StoreResult,
};

const STORE_FILE: &str = "job-builder-store.json";
const STORE_TMP_FILE: &str = "job-builder-store.json.tmp";
const CHANGE_CAPACITY: usize = 64;

/// Key/value store persisted as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: Arc<Dir>,
    path: Utf8PathBuf,
    write_lock: Arc<Mutex<()>>,
    changes: broadcast::Sender<StoreChange>,
}

impl FileKeyValueStore {
    /// Opens (creating when necessary) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the directory cannot be
    /// created or opened.
    pub fn open(dir: impl AsRef<Utf8Path>) -> StoreResult<Self> {
        let path = dir.as_ref().to_path_buf();
        Dir::create_ambient_dir_all(&path, ambient_authority()).map_err(StoreError::unavailable)?;
        let handle =
            Dir::open_ambient_dir(&path, ambient_authority()).map_err(StoreError::unavailable)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            dir: Arc::new(handle),
            path,
            write_lock: Arc::new(Mutex::new(())),
            changes,
        })
    }

    /// Returns the directory holding the store file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn mutate<F>(&self, keys: Vec<StoreKey>, edit: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Map<String, Value>) + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let dir = Arc::clone(&self.dir);
        run_blocking(move || {
            let mut document = read_document(&dir)?;
            edit(&mut document);
            write_document(&dir, &document)
        })
        .await?;
        debug!(?keys, path = %self.path, "store file updated");
        if self.changes.send(StoreChange::new(keys)).is_err() {
            debug!("no store subscribers");
        }
        Ok(())
    }
}

async fn run_blocking<F, T>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::unavailable(io::Error::other(format!("task join error: {e}"))))?
}

fn read_document(dir: &Dir) -> StoreResult<Map<String, Value>> {
    let raw = match dir.read_to_string(STORE_FILE) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => return Err(StoreError::unavailable(err)),
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(&raw).map_err(StoreError::unavailable)
}

fn write_document(dir: &Dir, document: &Map<String, Value>) -> StoreResult<()> {
    let encoded = serde_json::to_vec_pretty(document).map_err(StoreError::unavailable)?;
    dir.write(STORE_TMP_FILE, encoded)
        .map_err(StoreError::unavailable)?;
    dir.rename(STORE_TMP_FILE, dir, STORE_FILE)
        .map_err(StoreError::unavailable)
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, keys: &[StoreKey]) -> StoreResult<StoreEntries> {
        let dir = Arc::clone(&self.dir);
        let document = run_blocking(move || read_document(&dir)).await?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                document
                    .get(key.as_str())
                    .map(|value| (*key, value.clone()))
            })
            .collect())
    }

    async fn set(&self, entries: StoreEntries) -> StoreResult<()> {
        let keys: Vec<StoreKey> = entries.keys().copied().collect();
        self.mutate(keys, move |document| {
            for (key, value) in entries {
                document.insert(key.as_str().to_owned(), value);
            }
        })
        .await
    }

    async fn remove(&self, keys: &[StoreKey]) -> StoreResult<()> {
        let removed = keys.to_vec();
        self.mutate(keys.to_vec(), move |document| {
            for key in removed {
                document.remove(key.as_str());
            }
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
