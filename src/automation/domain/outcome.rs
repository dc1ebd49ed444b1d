//! How a driver activation ended.

use super::SkipReason;
use crate::task::domain::{TaskId, TaskState};

/// Result of one driver activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was done.
    Skipped(SkipReason),
    /// The task was moved to `state` and handed on (or completed).
    Advanced {
        /// Task acted on.
        task_id: TaskId,
        /// State written last.
        state: TaskState,
    },
    /// The run stopped without writing because the task changed hands.
    Superseded(TaskId),
    /// The run failed and the task was marked failed.
    Failed {
        /// Task acted on.
        task_id: TaskId,
        /// Recorded failure message.
        message: String,
    },
}
