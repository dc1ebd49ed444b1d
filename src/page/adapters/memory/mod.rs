//! In-memory page adapter for tests and dry runs.

mod page;

pub use page::{ElementSpec, InMemoryPage, PageEvent};
