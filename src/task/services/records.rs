//! Typed access to the task, job and prompt slots of the key/value store.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::task::{
    domain::{JobFields, Task},
    ports::{KeyValueStore, StoreEntries, StoreError, StoreKey, StoreResult},
};

/// The automation records read in a single store round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Current task, if one was created.
    pub task: Option<Task>,
    /// Cached job fields, if generated.
    pub job: Option<JobFields>,
    /// Prompt that produced `job`.
    pub raw_prompt: Option<String>,
}

/// Typed facade over a [`KeyValueStore`].
#[derive(Debug)]
pub struct TaskRecords<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> Clone for TaskRecords<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> TaskRecords<S> {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads task, job fields and raw prompt together.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails or a record is malformed.
    pub async fn load(&self) -> StoreResult<TaskSnapshot> {
        let entries = self.store.get(&StoreKey::AUTOMATION).await?;
        Ok(TaskSnapshot {
            task: decode(&entries, StoreKey::Task)?,
            job: decode(&entries, StoreKey::JobJson)?,
            raw_prompt: decode(&entries, StoreKey::RawPrompt)?,
        })
    }

    /// Loads only the task record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails or the record is malformed.
    pub async fn load_task(&self) -> StoreResult<Option<Task>> {
        let entries = self.store.get(&[StoreKey::Task]).await?;
        decode(&entries, StoreKey::Task)
    }

    /// Loads only the cached job fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] when the stored job is malformed.
    pub async fn load_job(&self) -> StoreResult<Option<JobFields>> {
        let entries = self.store.get(&[StoreKey::JobJson]).await?;
        decode(&entries, StoreKey::JobJson)
    }

    /// Overwrites the task record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or the write fails.
    pub async fn save_task(&self, task: &Task) -> StoreResult<()> {
        let value = encode(StoreKey::Task, task)?;
        self.store.set(BTreeMap::from([(StoreKey::Task, value)])).await
    }

    /// Persists job fields together with the prompt that produced them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or the write fails.
    pub async fn save_job(&self, job: &JobFields, raw_prompt: &str) -> StoreResult<()> {
        let entries = BTreeMap::from([
            (StoreKey::JobJson, encode(StoreKey::JobJson, job)?),
            (StoreKey::RawPrompt, Value::String(raw_prompt.to_owned())),
        ]);
        self.store.set(entries).await
    }

    /// Removes cached job fields and raw prompt.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the removal fails.
    pub async fn clear_job(&self) -> StoreResult<()> {
        self.store
            .remove(&[StoreKey::JobJson, StoreKey::RawPrompt])
            .await
    }

    /// Removes all automation records. Credentials are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the removal fails.
    pub async fn clear(&self) -> StoreResult<()> {
        self.store.remove(&StoreKey::AUTOMATION).await
    }
}

fn decode<T: DeserializeOwned>(entries: &StoreEntries, key: StoreKey) -> StoreResult<Option<T>> {
    match entries.get(&key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| StoreError::codec(key, err)),
    }
}

fn encode<T: Serialize>(key: StoreKey, value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|err| StoreError::codec(key, err))
}
