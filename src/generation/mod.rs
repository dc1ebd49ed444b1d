//! Job generation: turning a transcript prompt into [`JobFields`].
//!
//! The [`ports::JobGenerator`] port is consumed by the workflow automator
//! and the message router. Adapters call an OpenAI-compatible
//! chat-completion endpoint or replay scripted results.
//!
//! [`JobFields`]: crate::task::domain::JobFields

pub mod adapters;
pub mod ports;
