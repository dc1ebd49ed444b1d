//! Adapter implementations for the job generator port.

pub mod openai;
pub mod scripted;
