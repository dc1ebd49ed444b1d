//! Structured job definition produced from a transcript prompt.

use super::JobFieldsError;
use serde::{Deserialize, Serialize};

/// Job definition fields entered into the builder's "Add Job" modal.
///
/// `job_name` and `trigger` are required; `description` and `instructions`
/// default to empty strings. Deserialisation enforces the same rules, so a
/// record read from the store or from a model response is always usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "JobFieldsRecord")]
pub struct JobFields {
    job_name: String,
    description: String,
    trigger: String,
    instructions: String,
}

impl JobFields {
    /// Creates validated job fields.
    ///
    /// # Errors
    ///
    /// Returns [`JobFieldsError::MissingField`] when `job_name` or `trigger`
    /// is blank.
    pub fn new(
        job_name: impl Into<String>,
        description: impl Into<String>,
        trigger: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Result<Self, JobFieldsError> {
        let job_name = job_name.into();
        let trigger = trigger.into();
        if job_name.trim().is_empty() {
            return Err(JobFieldsError::MissingField("jobName"));
        }
        if trigger.trim().is_empty() {
            return Err(JobFieldsError::MissingField("trigger"));
        }
        Ok(Self {
            job_name,
            description: description.into(),
            trigger,
            instructions: instructions.into(),
        })
    }

    /// Returns the job name.
    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Returns the job description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the trigger phrase.
    #[must_use]
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Returns the agent instructions.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

/// Lenient wire shape; model output may omit or null optional fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobFieldsRecord {
    #[serde(default)]
    job_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    trigger: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
}

impl TryFrom<JobFieldsRecord> for JobFields {
    type Error = JobFieldsError;

    fn try_from(record: JobFieldsRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.job_name.unwrap_or_default(),
            record.description.unwrap_or_default(),
            record.trigger.unwrap_or_default(),
            record.instructions.unwrap_or_default(),
        )
    }
}
