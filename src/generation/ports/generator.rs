//! Job generator port.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::task::domain::JobFields;
use crate::task::ports::StoreError;

/// Result type for job generation.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Produces structured job fields from a transcript prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobGenerator: Send + Sync {
    /// Generates job fields for `prompt`.
    async fn generate_job(&self, prompt: &str) -> GenerationResult<JobFields>;
}

/// Errors returned by job generators.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// No credential is provisioned for the endpoint.
    #[error("missing API credential; set `openAiKey` in the store before running")]
    MissingCredential,

    /// The endpoint answered with a non-success status.
    #[error("job generation request failed ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The completion carried no content.
    #[error("no content returned from the completion")]
    EmptyContent,

    /// The content is not a valid job definition.
    #[error("unable to parse job definition from completion: {0}")]
    Unparseable(String),

    /// The request could not be delivered.
    #[error("job generation transport failure: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// A remote coordinator rejected the request.
    #[error("{0}")]
    Rejected(String),

    /// The credential could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GenerationError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
