//! Adapter implementations for the key/value store port.

pub mod file;
pub mod memory;
