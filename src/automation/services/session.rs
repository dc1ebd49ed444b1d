//! A driver's hold on the task for the length of one run.

use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::automation::domain::{AutomationError, DriverKind, RunOutcome};
use crate::task::{
    domain::{RunToken, Task, TaskDomainError, TaskId, TaskState},
    ports::KeyValueStore,
    services::TaskRecords,
};

/// Result type for driver operations.
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Lease-holding view of the task used by one driver run.
///
/// Every write goes through [`DriverSession::checkpoint`] first, so a run
/// stops as soon as the task is replaced or its lease is taken.
#[derive(Debug)]
pub struct DriverSession<S, C>
where
    S: KeyValueStore,
    C: Clock + Send + Sync,
{
    driver: DriverKind,
    records: TaskRecords<S>,
    clock: Arc<C>,
    token: RunToken,
    ttl: TimeDelta,
    task: Task,
}

impl<S, C> DriverSession<S, C>
where
    S: KeyValueStore,
    C: Clock + Send + Sync,
{
    /// Takes the run lease on `task` and confirms the write landed.
    ///
    /// Returns `Ok(None)` when another run holds a live lease.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the store fails.
    pub async fn begin(
        driver: DriverKind,
        records: TaskRecords<S>,
        clock: Arc<C>,
        mut task: Task,
        ttl: TimeDelta,
    ) -> AutomationResult<Option<Self>> {
        let token = RunToken::new();
        match task.acquire_lease(token, ttl, &*clock) {
            Ok(()) => {}
            Err(TaskDomainError::LeaseHeld(task_id)) => {
                debug!(%driver, %task_id, "task lease held by another run");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
        records.save_task(&task).await?;

        let confirmed = records
            .load_task()
            .await?
            .filter(|stored| stored.id() == task.id() && stored.is_leased_by(token));
        Ok(confirmed.map(|stored| Self {
            driver,
            records,
            clock,
            token,
            ttl,
            task: stored,
        }))
    }

    /// Returns the task as last read or written by this run.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the task identifier this run works on.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task.id()
    }

    /// Returns the task's current state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.task.state()
    }

    /// Re-reads the task and confirms this run still owns it.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Superseded`] when the task was removed,
    /// replaced, finished, or leased to another run.
    pub async fn checkpoint(&mut self) -> AutomationResult<&Task> {
        let task_id = self.task.id();
        match self.records.load_task().await? {
            Some(stored)
                if stored.id() == task_id
                    && stored.is_leased_by(self.token)
                    && !stored.state().is_terminal() =>
            {
                self.task = stored;
                Ok(&self.task)
            }
            _ => Err(AutomationError::Superseded(task_id)),
        }
    }

    /// Moves the task to `next`, keeping the lease.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Superseded`] when ownership was lost, or
    /// the domain or store error that stopped the write.
    pub async fn advance(&mut self, next: TaskState) -> AutomationResult<()> {
        self.checkpoint().await?;
        let from = self.task.state();
        self.task.transition_to(next, &*self.clock)?;
        self.records.save_task(&self.task).await?;
        debug!(
            driver = %self.driver,
            task_id = %self.task.id(),
            from = from.as_str(),
            to = next.as_str(),
            "task advanced"
        );
        Ok(())
    }

    /// Moves the task to `next` and releases the lease for the next driver.
    ///
    /// # Errors
    ///
    /// As for [`DriverSession::advance`].
    pub async fn handoff(&mut self, next: TaskState) -> AutomationResult<()> {
        self.checkpoint().await?;
        self.task.transition_to(next, &*self.clock)?;
        self.task.release_lease(self.token, &*self.clock);
        self.records.save_task(&self.task).await?;
        debug!(
            driver = %self.driver,
            task_id = %self.task.id(),
            to = next.as_str(),
            "task handed off"
        );
        Ok(())
    }

    /// Refreshes the lease timestamp without changing state.
    ///
    /// # Errors
    ///
    /// As for [`DriverSession::advance`].
    pub async fn renew(&mut self) -> AutomationResult<()> {
        self.checkpoint().await?;
        self.task.acquire_lease(self.token, self.ttl, &*self.clock)?;
        self.records.save_task(&self.task).await?;
        Ok(())
    }

    /// Marks the task failed with `message`.
    ///
    /// Only writes when the stored task is still this run's task, is not
    /// terminal, and is leased by this run or not leased at all. Returns
    /// `false` when nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the store fails.
    pub async fn fail(&self, message: &str) -> AutomationResult<bool> {
        let Some(mut stored) = self.records.load_task().await? else {
            return Ok(false);
        };
        let owned = stored.lease().is_none() || stored.is_leased_by(self.token);
        if stored.id() != self.task.id() || !owned || stored.state().is_terminal() {
            return Ok(false);
        }
        stored.fail(message, &*self.clock)?;
        self.records.save_task(&stored).await?;
        Ok(true)
    }

    /// Turns the result of a run into its outcome, recording failures on
    /// the task.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the failure cannot be written.
    pub async fn conclude(self, result: AutomationResult<TaskState>) -> AutomationResult<RunOutcome> {
        let task_id = self.task.id();
        match result {
            Ok(state) => Ok(RunOutcome::Advanced { task_id, state }),
            Err(AutomationError::Superseded(_)) => {
                warn!(driver = %self.driver, %task_id, "run superseded, stopping");
                Ok(RunOutcome::Superseded(task_id))
            }
            Err(err) => {
                let message = err.to_string();
                error!(driver = %self.driver, %task_id, error = %message, "driver run failed");
                if self.fail(&message).await? {
                    Ok(RunOutcome::Failed { task_id, message })
                } else {
                    warn!(driver = %self.driver, %task_id, "task changed before failure could be recorded");
                    Ok(RunOutcome::Superseded(task_id))
                }
            }
        }
    }
}
