//! Errors raised while a driver runs.

use thiserror::Error;

use crate::generation::ports::GenerationError;
use crate::page::ports::PageError;
use crate::page::services::WaitError;
use crate::task::domain::{TaskDomainError, TaskId};
use crate::task::ports::StoreError;

/// Errors that end a driver run.
///
/// Apart from [`AutomationError::Superseded`], each of these is recorded on
/// the task as its failure message.
#[derive(Debug, Clone, Error)]
pub enum AutomationError {
    /// Store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An expected element never appeared.
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// The page rejected an action.
    #[error(transparent)]
    Page(#[from] PageError),

    /// Job generation failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The task rejected a transition.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// A required element was not found by any strategy.
    #[error("unable to locate the {0}")]
    ElementNotFound(&'static str),

    /// Navigation to the workflow builder failed.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The task was replaced, or its lease taken, mid-run.
    #[error("task {0} was superseded by another run")]
    Superseded(TaskId),
}
