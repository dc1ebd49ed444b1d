//! Generator replaying queued results.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::generation::ports::{GenerationError, GenerationResult, JobGenerator};
use crate::task::domain::JobFields;

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<GenerationResult<JobFields>>,
    prompts: Vec<String>,
}

/// [`JobGenerator`] that answers from a queue and records every prompt.
///
/// An exhausted queue answers with [`GenerationError::EmptyContent`].
/// Clones share the queue and the record.
#[derive(Debug, Clone, Default)]
pub struct ScriptedJobGenerator {
    script: Arc<Mutex<Script>>,
}

impl ScriptedJobGenerator {
    /// Creates a generator with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that answers once with `job`.
    #[must_use]
    pub fn returning(job: JobFields) -> Self {
        let generator = Self::new();
        generator.push(Ok(job));
        generator
    }

    /// Queues a result.
    pub fn push(&self, result: GenerationResult<JobFields>) {
        if let Ok(mut script) = self.script.lock() {
            script.responses.push_back(result);
        }
    }

    /// Returns how many times the generator was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.script.lock().map_or(0, |script| script.prompts.len())
    }

    /// Returns the prompts received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.script
            .lock()
            .map(|script| script.prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobGenerator for ScriptedJobGenerator {
    async fn generate_job(&self, prompt: &str) -> GenerationResult<JobFields> {
        let mut script = self
            .script
            .lock()
            .map_err(|err| GenerationError::transport(std::io::Error::other(err.to_string())))?;
        script.prompts.push(prompt.to_owned());
        script
            .responses
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyContent))
    }
}
