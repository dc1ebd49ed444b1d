//! Error types for task domain validation and parsing.

use super::{TaskId, TaskState};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The phone number identifier is blank or malformed.
    #[error("invalid phone number id '{0}'")]
    InvalidPhoneNumberId(String),

    /// The workflow definition identifier is blank.
    #[error("invalid workflow definition id '{0}'")]
    InvalidWorkflowDefinitionId(String),

    /// The state machine does not permit the requested transition.
    #[error("task {task_id} cannot transition from {} to {}", from.as_str(), to.as_str())]
    InvalidStateTransition {
        /// Task whose transition was rejected.
        task_id: TaskId,
        /// State the task is currently in.
        from: TaskState,
        /// Requested target state.
        to: TaskState,
    },

    /// Another run currently holds the task lease.
    #[error("task {0} is leased by another run")]
    LeaseHeld(TaskId),

    /// The deep link could not be built from the configured base URL.
    #[error("cannot build workflow builder link from base '{0}'")]
    InvalidLinkBase(String),
}

/// Error returned while parsing task states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);

/// Error returned when job fields are missing a required value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobFieldsError {
    /// A required field is absent or blank.
    #[error("job definition is missing required field '{0}'")]
    MissingField(&'static str),
}
