//! File-backed adapter implementations.

mod store;

pub use store::FileKeyValueStore;
