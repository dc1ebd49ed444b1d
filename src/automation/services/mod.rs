//! Page drivers and the guards that keep their runs exclusive.

pub mod affordances;
mod automator;
mod context;
mod guard;
mod navigator;
mod session;

pub use automator::WorkflowAutomator;
pub use context::PageContext;
pub use guard::{FlightPermit, InitGuard, SingleFlight};
pub use navigator::SonaNavigator;
pub use session::{AutomationResult, DriverSession};
