//! Message shapes exchanged with the coordinator.

mod protocol;

pub use protocol::{MessageType, ProtocolError, Request, Response};
