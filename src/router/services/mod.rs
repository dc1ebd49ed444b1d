//! Router and client services.

mod client;
mod router;

pub use client::{RoutedJobGenerator, RouterClient};
pub use router::{Envelope, MessageRouter, RouterError};
