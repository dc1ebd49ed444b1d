//! Port definitions for page interaction.

pub mod page;

pub use page::{DomMutation, Page, PageError, PageResult};
