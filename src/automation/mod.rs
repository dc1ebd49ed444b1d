//! Page drivers for the job builder flow.
//!
//! Two drivers share the persisted task record. [`SonaNavigator`] moves a
//! `navigatingToSona` task onto the workflow builder page and
//! [`WorkflowAutomator`] takes it from there to `completed`. Each decides
//! whether to act with a pure [`RunDecision`] over the stored records and
//! holds a run lease on the task while it writes, so overlapping runs stop
//! instead of interleaving.
//!
//! [`SonaNavigator`]: services::SonaNavigator
//! [`WorkflowAutomator`]: services::WorkflowAutomator
//! [`RunDecision`]: domain::RunDecision

pub mod domain;
pub mod services;
