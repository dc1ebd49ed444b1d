//! Script-host page adapter for real browser sessions.

mod page;

pub use page::{ScriptHost, ScriptedPage};
