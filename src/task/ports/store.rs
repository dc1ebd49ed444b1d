//! Key/value store port shared by every driver and the coordinator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Result type for key/value store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Entries read from or written to the store.
pub type StoreEntries = BTreeMap<StoreKey, Value>;

/// The fixed set of named slots held in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreKey {
    /// The task record.
    #[serde(rename = "quoJobBuilderTask")]
    Task,
    /// Cached job fields.
    #[serde(rename = "quoJobBuilderJobJson")]
    JobJson,
    /// Prompt that produced the cached job fields.
    #[serde(rename = "quoJobBuilderPrompt")]
    RawPrompt,
    /// Externally provisioned credential for the generation endpoint.
    #[serde(rename = "openAiKey")]
    OpenAiKey,
}

impl StoreKey {
    /// Keys owned by the automation flow (everything except credentials).
    pub const AUTOMATION: [Self; 3] = [Self::Task, Self::JobJson, Self::RawPrompt];

    /// Returns the persisted key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "quoJobBuilderTask",
            Self::JobJson => "quoJobBuilderJobJson",
            Self::RawPrompt => "quoJobBuilderPrompt",
            Self::OpenAiKey => "openAiKey",
        }
    }

    /// Looks a key up by its persisted name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Task, Self::JobJson, Self::RawPrompt, Self::OpenAiKey]
            .into_iter()
            .find(|key| key.as_str() == name)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted after every write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    keys: Vec<StoreKey>,
}

impl StoreChange {
    /// Creates a notification for the given keys.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = StoreKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Returns the changed keys.
    #[must_use]
    pub fn keys(&self) -> &[StoreKey] {
        &self.keys
    }

    /// Returns `true` when any of `watched` changed.
    #[must_use]
    pub fn touches(&self, watched: &[StoreKey]) -> bool {
        self.keys.iter().any(|key| watched.contains(key))
    }
}

/// Asynchronous key/value persistence with change notification.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the requested keys; absent keys are omitted from the result.
    async fn get(&self, keys: &[StoreKey]) -> StoreResult<StoreEntries>;

    /// Writes all entries and notifies subscribers.
    async fn set(&self, entries: StoreEntries) -> StoreResult<()>;

    /// Removes the keys and notifies subscribers.
    async fn remove(&self, keys: &[StoreKey]) -> StoreResult<()>;

    /// Subscribes to change notifications, including this process's writes.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Errors returned by key/value store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing storage is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be encoded or decoded.
    #[error("invalid value for store key {key}: {message}")]
    Codec {
        /// Key holding the offending value.
        key: StoreKey,
        /// Decoder message.
        message: String,
    },
}

impl StoreError {
    /// Wraps a backend failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }

    /// Builds a codec error for `key`.
    pub fn codec(key: StoreKey, err: impl fmt::Display) -> Self {
        Self::Codec {
            key,
            message: err.to_string(),
        }
    }
}
