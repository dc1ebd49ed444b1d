//! Domain model for page content.
//!
//! Page adapters hand out immutable [`DomSnapshot`]s; everything that
//! decides *which* element to act on works against those snapshots and is
//! therefore pure and deterministic.

mod selector;
mod snapshot;
mod text;

pub use selector::{InvalidSelector, Selector};
pub use snapshot::{DomSnapshot, ElementView, NODE_ID_ATTRIBUTE, NodeId};
pub use text::{LabelMatcher, normalize_text};
