//! Driver-side access to the coordinator.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::{Envelope, RouterError};
use crate::generation::ports::{GenerationError, GenerationResult, JobGenerator};
use crate::router::domain::{Request, Response};
use crate::task::domain::{JobFields, Task};

/// Sends requests to a [`MessageRouter`](super::MessageRouter).
#[derive(Debug, Clone)]
pub struct RouterClient {
    outbox: mpsc::Sender<Envelope>,
}

impl RouterClient {
    /// Creates a client sending into `outbox`.
    #[must_use]
    pub const fn new(outbox: mpsc::Sender<Envelope>) -> Self {
        Self { outbox }
    }

    /// Sends `request` and waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Protocol`] when the request cannot be encoded,
    /// [`RouterError::Disconnected`] when the router has stopped, or
    /// [`RouterError::Unanswered`] when it dropped the request.
    pub async fn send(&self, request: &Request) -> Result<Response, RouterError> {
        let message = request.to_message()?;
        let (reply, answer) = oneshot::channel();
        self.outbox
            .send(Envelope { message, reply })
            .await
            .map_err(|_| RouterError::Disconnected)?;
        answer
            .await
            .map_err(|_| RouterError::Unanswered(request.message_type().as_str()))
    }

    /// Reads the automation records keyed by store key name.
    ///
    /// # Errors
    ///
    /// As for [`RouterClient::send`]; a failure reply is returned as is.
    pub async fn state(&self) -> Result<Response, RouterError> {
        self.send(&Request::GetState).await
    }

    /// Overwrites the task record.
    ///
    /// # Errors
    ///
    /// As for [`RouterClient::send`].
    pub async fn set_task(&self, task: Task) -> Result<Response, RouterError> {
        self.send(&Request::SetTask(Box::new(task))).await
    }

    /// Removes the automation records.
    ///
    /// # Errors
    ///
    /// As for [`RouterClient::send`].
    pub async fn clear_state(&self) -> Result<Response, RouterError> {
        self.send(&Request::ClearState).await
    }
}

/// [`JobGenerator`] that asks the coordinator to generate, so drivers never
/// hold the endpoint credential.
#[derive(Debug, Clone)]
pub struct RoutedJobGenerator {
    client: RouterClient,
}

impl RoutedJobGenerator {
    /// Wraps `client`.
    #[must_use]
    pub const fn new(client: RouterClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobGenerator for RoutedJobGenerator {
    async fn generate_job(&self, prompt: &str) -> GenerationResult<JobFields> {
        let response = self
            .client
            .send(&Request::GenerateJob {
                prompt: prompt.to_owned(),
            })
            .await
            .map_err(GenerationError::transport)?;
        let result = response
            .into_result()
            .map_err(GenerationError::Rejected)?
            .unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|err| GenerationError::Unparseable(err.to_string()))
    }
}
