//! Domain model for the automation task.
//!
//! The task domain models the single persisted task record, its state
//! machine and run lease, and the job fields derived from the prompt, while
//! keeping all infrastructure concerns outside of the domain boundary.

mod error;
mod ids;
mod job;
mod link;
mod task;

pub use error::{JobFieldsError, ParseTaskStateError, TaskDomainError};
pub use ids::{PhoneNumberId, RunToken, TaskId, WorkflowDefinitionId};
pub use job::JobFields;
pub use link::{is_workflow_builder_url, workflow_builder_link};
pub use task::{PersistedTaskData, RunLease, Task, TaskState};
