//! Port contracts for task persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by task services and
//! the page drivers.

pub mod store;

pub use store::{KeyValueStore, StoreChange, StoreEntries, StoreError, StoreKey, StoreResult};
