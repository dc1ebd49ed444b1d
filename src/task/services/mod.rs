//! Application services for task records and lifecycle orchestration.

mod lifecycle;
mod records;

pub use lifecycle::{
    CreateTaskRequest, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub use records::{TaskRecords, TaskSnapshot};
