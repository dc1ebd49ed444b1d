//! What a driver should do, derived only from the stored records.

use std::fmt;

use crate::task::domain::{JobFields, Task, TaskState};

/// The two page drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Opens the workflow builder from the phone number settings.
    Navigator,
    /// Creates and fills the job inside the workflow builder.
    Workflow,
}

impl DriverKind {
    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigator => "navigator",
            Self::Workflow => "workflow",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a driver did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No task record exists.
    NoTask,
    /// The task's state belongs to another driver (or is terminal).
    StateNotHandled(TaskState),
    /// Another run holds a live lease on the task.
    LeaseHeld,
    /// This driver is already running in this process.
    AlreadyRunning,
    /// Page-load activation already happened in this page context.
    AlreadyInitialized,
}

/// Where the workflow automator gets its job fields from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPlan {
    /// Cached fields are used; the generator is not called.
    Cached(JobFields),
    /// Fields must be generated from the task prompt.
    Generate,
}

impl JobPlan {
    /// Reuses cached fields whenever present, whatever the task state.
    #[must_use]
    pub fn from_cache(job: Option<JobFields>) -> Self {
        job.map_or(Self::Generate, Self::Cached)
    }
}

/// Decision computed from the current task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunDecision {
    /// Do nothing.
    Skip(SkipReason),
    /// Open the workflow builder for the task.
    Navigate,
    /// Drive the workflow builder from the given state.
    Automate(TaskState),
}

impl RunDecision {
    /// Decides the navigator's action: act only in `NavigatingToSona`.
    #[must_use]
    pub fn for_navigator(task: Option<&Task>) -> Self {
        match task.map(Task::state) {
            None => Self::Skip(SkipReason::NoTask),
            Some(TaskState::NavigatingToSona) => Self::Navigate,
            Some(state) => Self::Skip(SkipReason::StateNotHandled(state)),
        }
    }

    /// Decides the workflow automator's action: act only in the
    /// workflow-active states.
    ///
    /// Job fields are read inside the run, so a malformed cache is recorded
    /// as a task failure; see [`JobPlan::from_cache`].
    #[must_use]
    pub fn for_workflow(task: Option<&Task>) -> Self {
        match task.map(Task::state) {
            None => Self::Skip(SkipReason::NoTask),
            Some(state) if state.is_workflow_active() => Self::Automate(state),
            Some(state) => Self::Skip(SkipReason::StateNotHandled(state)),
        }
    }
}
