//! Adapter implementations for the page port.

pub mod memory;
pub mod script;
