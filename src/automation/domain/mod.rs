//! Pure decision logic and result types for the page drivers.

mod decision;
mod error;
mod outcome;

pub use decision::{DriverKind, JobPlan, RunDecision, SkipReason};
pub use error::AutomationError;
pub use outcome::RunOutcome;
