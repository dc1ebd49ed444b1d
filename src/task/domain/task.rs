//! Task record and its lifecycle state machine.

use super::{
    ParseTaskStateError, PhoneNumberId, RunToken, TaskDomainError, TaskId, WorkflowDefinitionId,
};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    /// Task has been created; navigation has not been requested yet.
    Started,
    /// The navigator should open the phone number's workflow builder.
    NavigatingToSona,
    /// The builder page has been requested; the automator takes over.
    OpenSonaManage,
    /// The automator is working inside the builder page.
    WorkflowReady,
    /// Job fields are being generated from the prompt.
    GeneratingJob,
    /// Job fields are available and the modal is being populated.
    JobReady,
    /// The job was created.
    Completed,
    /// A driver failed; see the task error.
    Failed,
}

impl TaskState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Started,
        Self::NavigatingToSona,
        Self::OpenSonaManage,
        Self::WorkflowReady,
        Self::GeneratingJob,
        Self::JobReady,
        Self::Completed,
        Self::Failed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::NavigatingToSona => "navigatingToSona",
            Self::OpenSonaManage => "openSonaManage",
            Self::WorkflowReady => "workflowReady",
            Self::GeneratingJob => "generatingJob",
            Self::JobReady => "jobReady",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for states that end a task instance.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` for the states the workflow automator acts on.
    #[must_use]
    pub const fn is_workflow_active(self) -> bool {
        matches!(
            self,
            Self::OpenSonaManage | Self::WorkflowReady | Self::GeneratingJob | Self::JobReady
        )
    }

    /// Returns whether the state machine permits moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed)
                | (Self::Started, Self::NavigatingToSona)
                | (Self::NavigatingToSona, Self::OpenSonaManage)
                | (Self::OpenSonaManage, Self::WorkflowReady)
                | (Self::WorkflowReady, Self::GeneratingJob | Self::Completed)
                | (Self::GeneratingJob, Self::JobReady)
                | (Self::JobReady, Self::Completed | Self::GeneratingJob)
        )
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| ParseTaskStateError(value.to_owned()))
    }
}

/// Lease held by the driver run currently mutating the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLease {
    token: RunToken,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    renewed_at: DateTime<Utc>,
}

impl RunLease {
    /// Creates a lease for `token` renewed at `renewed_at`.
    #[must_use]
    pub const fn new(token: RunToken, renewed_at: DateTime<Utc>) -> Self {
        Self { token, renewed_at }
    }

    /// Returns the run token holding the lease.
    #[must_use]
    pub const fn token(&self) -> RunToken {
        self.token
    }

    /// Returns the last renewal time.
    #[must_use]
    pub const fn renewed_at(&self) -> DateTime<Utc> {
        self.renewed_at
    }

    /// Returns `true` once the lease has gone `ttl` without renewal.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.renewed_at) >= ttl
    }
}

/// The single persisted automation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    state: TaskState,
    phone_number_id: PhoneNumberId,
    workflow_definition_id: WorkflowDefinitionId,
    prompt: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lease: Option<RunLease>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Phone number whose workflow is edited.
    pub phone_number_id: PhoneNumberId,
    /// Workflow definition opened in the builder.
    pub workflow_definition_id: WorkflowDefinitionId,
    /// Transcript prompt.
    pub prompt: String,
    /// Latest mutation timestamp.
    pub last_updated_at: DateTime<Utc>,
    /// Failure message, if any.
    pub error: Option<String>,
    /// Current run lease, if any.
    pub lease: Option<RunLease>,
}

impl Task {
    /// Creates a task in [`TaskState::Started`].
    #[must_use]
    pub fn new(
        phone_number_id: PhoneNumberId,
        workflow_definition_id: WorkflowDefinitionId,
        prompt: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: TaskId::new(),
            state: TaskState::Started,
            phone_number_id,
            workflow_definition_id,
            prompt: prompt.into(),
            last_updated_at: stored_now(clock),
            error: None,
            lease: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            state: data.state,
            phone_number_id: data.phone_number_id,
            workflow_definition_id: data.workflow_definition_id,
            prompt: data.prompt,
            last_updated_at: data.last_updated_at,
            error: data.error,
            lease: data.lease,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the phone number identifier.
    #[must_use]
    pub const fn phone_number_id(&self) -> &PhoneNumberId {
        &self.phone_number_id
    }

    /// Returns the workflow definition identifier.
    #[must_use]
    pub const fn workflow_definition_id(&self) -> &WorkflowDefinitionId {
        &self.workflow_definition_id
    }

    /// Returns the transcript prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    /// Returns the failure message when the task failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the current run lease.
    #[must_use]
    pub const fn lease(&self) -> Option<&RunLease> {
        self.lease.as_ref()
    }

    /// Returns `true` when `token` holds the lease.
    #[must_use]
    pub fn is_leased_by(&self, token: RunToken) -> bool {
        self.lease.is_some_and(|lease| lease.token() == token)
    }

    /// Moves the task to `next`.
    ///
    /// Entering a terminal state releases the lease.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the state
    /// machine forbids the move. Use [`Task::fail`] to enter
    /// [`TaskState::Failed`] so the error message is recorded.
    pub fn transition_to(&mut self, next: TaskState, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if next == TaskState::Failed || !self.state.can_transition_to(next) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.lease = None;
        }
        self.touch(clock);
        Ok(())
    }

    /// Marks the task failed with `message`, releasing the lease.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the task is
    /// already terminal.
    pub fn fail(&mut self, message: impl Into<String>, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if !self.state.can_transition_to(TaskState::Failed) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                to: TaskState::Failed,
            });
        }
        self.state = TaskState::Failed;
        self.error = Some(message.into());
        self.lease = None;
        self.touch(clock);
        Ok(())
    }

    /// Takes the lease for `token`.
    ///
    /// Succeeds when no lease exists, the existing lease expired after `ttl`,
    /// or `token` already holds it (renewal).
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::LeaseHeld`] while another run holds a live
    /// lease.
    pub fn acquire_lease(
        &mut self,
        token: RunToken,
        ttl: TimeDelta,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let now = stored_now(clock);
        if let Some(lease) = self.lease {
            if lease.token() != token && !lease.is_expired(now, ttl) {
                return Err(TaskDomainError::LeaseHeld(self.id));
            }
        }
        self.lease = Some(RunLease::new(token, now));
        self.last_updated_at = now;
        Ok(())
    }

    /// Drops the lease if `token` holds it.
    pub fn release_lease(&mut self, token: RunToken, clock: &impl Clock) {
        if self.is_leased_by(token) {
            self.lease = None;
            self.touch(clock);
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        let now = stored_now(clock);
        self.last_updated_at = now;
        if let Some(lease) = self.lease.as_mut() {
            lease.renewed_at = now;
        }
    }
}

/// Reads the clock at the millisecond precision timestamps are stored with,
/// so a task equals itself after a store round trip.
fn stored_now(clock: &impl Clock) -> DateTime<Utc> {
    clock.utc().trunc_subsecs(3)
}
