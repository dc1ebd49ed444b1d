//! Coordinator-side message handling.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::generation::ports::{GenerationError, JobGenerator};
use crate::router::domain::{ProtocolError, Request, Response};
use crate::task::{
    ports::{KeyValueStore, StoreError, StoreKey},
    services::TaskRecords,
};

/// Errors raised while serving or sending requests.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// The message payload is unusable.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Job generation failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// A result could not be encoded.
    #[error("unable to encode result: {0}")]
    Encode(String),
    /// The coordinator is no longer running.
    #[error("message router is not running")]
    Disconnected,
    /// The coordinator dropped the request without replying.
    #[error("request {0} received no reply")]
    Unanswered(&'static str),
}

/// A message together with the channel its reply goes to.
#[derive(Debug)]
pub struct Envelope {
    /// Raw `{type, payload}` message.
    pub message: Value,
    /// Reply channel; dropped without a reply for ignored messages.
    pub reply: oneshot::Sender<Response>,
}

/// Answers driver requests against the store and the job generator.
#[derive(Debug)]
pub struct MessageRouter<S, G>
where
    S: KeyValueStore,
    G: JobGenerator,
{
    records: TaskRecords<S>,
    generator: Arc<G>,
}

impl<S, G> MessageRouter<S, G>
where
    S: KeyValueStore,
    G: JobGenerator,
{
    /// Creates a router over `store` and `generator`.
    #[must_use]
    pub const fn new(store: Arc<S>, generator: Arc<G>) -> Self {
        Self {
            records: TaskRecords::new(store),
            generator,
        }
    }

    /// Answers every enveloped message until all senders are dropped.
    pub async fn serve(&self, mut inbox: mpsc::Receiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            let Some(response) = self.dispatch(&envelope.message).await else {
                continue;
            };
            if envelope.reply.send(response).is_err() {
                debug!("requester went away before the reply");
            }
        }
        info!("message router stopped");
    }

    /// Decodes and handles a raw message.
    ///
    /// Returns `None` for messages without a recognised type.
    pub async fn dispatch(&self, message: &Value) -> Option<Response> {
        match Request::from_message(message)? {
            Ok(request) => Some(self.handle(request).await),
            Err(err) => {
                warn!(error = %err, "rejecting malformed request");
                Some(Response::failure(err.to_string()))
            }
        }
    }

    /// Handles a decoded request; failures become failure replies.
    pub async fn handle(&self, request: Request) -> Response {
        let kind = request.message_type();
        match self.try_handle(request).await {
            Ok(result) => {
                debug!(request = kind.as_str(), "request handled");
                Response::success(result)
            }
            Err(err) => {
                warn!(request = kind.as_str(), error = %err, "request failed");
                Response::failure(err.to_string())
            }
        }
    }

    async fn try_handle(&self, request: Request) -> Result<Option<Value>, RouterError> {
        match request {
            Request::GenerateJob { prompt } => {
                let job = self.generator.generate_job(&prompt).await?;
                self.records.save_job(&job, &prompt).await?;
                info!(job_name = job.job_name(), "job fields generated and cached");
                serde_json::to_value(&job)
                    .map(Some)
                    .map_err(|err| RouterError::Encode(err.to_string()))
            }
            Request::GetState => {
                let entries = self.records.store().get(&StoreKey::AUTOMATION).await?;
                let state: Map<String, Value> = entries
                    .into_iter()
                    .map(|(key, value)| (key.as_str().to_owned(), value))
                    .collect();
                Ok(Some(Value::Object(state)))
            }
            Request::SetTask(task) => {
                self.records.save_task(&task).await?;
                Ok(None)
            }
            Request::ClearState => {
                self.records.clear().await?;
                Ok(None)
            }
        }
    }
}
