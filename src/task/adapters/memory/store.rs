//! In-memory key/value store with broadcast change notifications.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::task::ports::{
    KeyValueStore, StoreChange, StoreEntries, StoreError, StoreKey, StoreResult,
};

const CHANGE_CAPACITY: usize = 64;

/// Thread-safe in-memory key/value store.
///
/// Clones share the same entries and notification channel.
#[derive(Debug, Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<StoreEntries>>,
    changes: broadcast::Sender<StoreChange>,
    unavailable: Arc<AtomicBool>,
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            changes,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`]
    /// until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(std::io::Error::other(
                "in-memory store marked unavailable",
            )));
        }
        Ok(())
    }

    fn notify(&self, keys: Vec<StoreKey>) {
        debug!(?keys, "store changed");
        if self.changes.send(StoreChange::new(keys)).is_err() {
            debug!("no store subscribers");
        }
    }
}

fn lock_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::unavailable(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, keys: &[StoreKey]) -> StoreResult<StoreEntries> {
        self.ensure_available()?;
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (*key, value.clone())))
            .collect())
    }

    async fn set(&self, entries: StoreEntries) -> StoreResult<()> {
        self.ensure_available()?;
        let keys: Vec<StoreKey> = entries.keys().copied().collect();
        {
            let mut stored = self.entries.write().map_err(lock_error)?;
            stored.extend(entries);
        }
        self.notify(keys);
        Ok(())
    }

    async fn remove(&self, keys: &[StoreKey]) -> StoreResult<()> {
        self.ensure_available()?;
        {
            let mut stored = self.entries.write().map_err(lock_error)?;
            for key in keys {
                stored.remove(key);
            }
        }
        self.notify(keys.to_vec());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
