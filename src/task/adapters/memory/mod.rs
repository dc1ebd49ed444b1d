//! In-memory adapter implementations.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! unit testing and single-process runs.

mod store;

pub use store::InMemoryKeyValueStore;
