//! Service layer for creating, advancing and clearing the task record.

use crate::task::{
    domain::{PhoneNumberId, Task, TaskDomainError, TaskState, WorkflowDefinitionId},
    ports::{KeyValueStore, StoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::TaskRecords;

/// Request payload for creating a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    phone_number_id: String,
    workflow_definition_id: String,
    prompt: String,
}

impl CreateTaskRequest {
    /// Creates a request from raw identifiers and the transcript prompt.
    #[must_use]
    pub fn new(
        phone_number_id: impl Into<String>,
        workflow_definition_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
            workflow_definition_id: workflow_definition_id.into(),
            prompt: prompt.into(),
        }
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// No task exists to operate on.
    #[error("no task has been created")]
    NoTask,
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<S, C>
where
    S: KeyValueStore,
    C: Clock + Send + Sync,
{
    records: TaskRecords<S>,
    clock: Arc<C>,
}

impl<S, C> TaskLifecycleService<S, C>
where
    S: KeyValueStore,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            records: TaskRecords::new(store),
            clock,
        }
    }

    /// Replaces any existing task with a new one in [`TaskState::Started`].
    ///
    /// Cached job fields and raw prompt are removed first so the new prompt
    /// is always sent to the generator.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when identifiers are invalid or the
    /// store rejects the write.
    pub async fn create(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let phone_number_id = PhoneNumberId::new(request.phone_number_id)?;
        let workflow_definition_id = WorkflowDefinitionId::new(request.workflow_definition_id)?;
        let task = Task::new(
            phone_number_id,
            workflow_definition_id,
            request.prompt,
            &*self.clock,
        );
        self.records.clear_job().await?;
        self.records.save_task(&task).await?;
        info!(task_id = %task.id(), "task created");
        Ok(task)
    }

    /// Moves the current task from `Started` to `NavigatingToSona`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NoTask`] when no task exists and
    /// [`TaskLifecycleError::Domain`] when the task is not in `Started`.
    pub async fn request_navigation(&self) -> TaskLifecycleResult<Task> {
        let mut task = self
            .records
            .load_task()
            .await?
            .ok_or(TaskLifecycleError::NoTask)?;
        task.transition_to(TaskState::NavigatingToSona, &*self.clock)?;
        self.records.save_task(&task).await?;
        info!(task_id = %task.id(), "navigation requested");
        Ok(task)
    }

    /// Returns the current task, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when the read fails.
    pub async fn current(&self) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.records.load_task().await?)
    }

    /// Removes the task together with cached job data.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when the removal fails.
    pub async fn clear(&self) -> TaskLifecycleResult<()> {
        self.records.clear().await?;
        Ok(())
    }
}
