//! Typed requests and replies over JSON messages.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::task::domain::Task;

/// Recognised message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Generate job fields from a prompt and cache them.
    GenerateJob,
    /// Read the task, cached job fields and raw prompt.
    GetState,
    /// Overwrite the task record.
    SetTask,
    /// Remove the task, cached job fields and raw prompt.
    ClearState,
}

impl MessageType {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenerateJob => "quoJobBuilder.generateJob",
            Self::GetState => "quoJobBuilder.getState",
            Self::SetTask => "quoJobBuilder.setTask",
            Self::ClearState => "quoJobBuilder.clearState",
        }
    }

    /// Looks a type up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::GenerateJob,
            Self::GetState,
            Self::SetTask,
            Self::ClearState,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == name)
    }
}

/// A recognised message whose payload is unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// `generateJob` without a string `prompt`.
    #[error("Missing prompt payload for job generation.")]
    MissingPrompt,
    /// `setTask` whose payload is not a task record.
    #[error("invalid task payload: {0}")]
    InvalidTask(String),
    /// A request payload could not be serialised.
    #[error("request could not be encoded: {0}")]
    Encode(String),
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Generate and cache job fields for `prompt`.
    GenerateJob {
        /// Transcript prompt.
        prompt: String,
    },
    /// Read the automation records.
    GetState,
    /// Overwrite the task record.
    SetTask(Box<Task>),
    /// Remove the automation records.
    ClearState,
}

impl Request {
    /// Returns the message type.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::GenerateJob { .. } => MessageType::GenerateJob,
            Self::GetState => MessageType::GetState,
            Self::SetTask(_) => MessageType::SetTask,
            Self::ClearState => MessageType::ClearState,
        }
    }

    /// Decodes a `{type, payload}` message.
    ///
    /// Returns `None` when the message has no recognised `type`; such
    /// messages belong to someone else and are not answered.
    #[must_use]
    pub fn from_message(message: &Value) -> Option<Result<Self, ProtocolError>> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .and_then(MessageType::from_name)?;
        let payload = message.get("payload").unwrap_or(&Value::Null);
        Some(match kind {
            MessageType::GenerateJob => payload
                .get("prompt")
                .and_then(Value::as_str)
                .map(|prompt| Self::GenerateJob {
                    prompt: prompt.to_owned(),
                })
                .ok_or(ProtocolError::MissingPrompt),
            MessageType::GetState => Ok(Self::GetState),
            MessageType::SetTask => serde_json::from_value(payload.clone())
                .map(|task| Self::SetTask(Box::new(task)))
                .map_err(|err| ProtocolError::InvalidTask(err.to_string())),
            MessageType::ClearState => Ok(Self::ClearState),
        })
    }

    /// Encodes the request as a `{type, payload}` message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] when the payload cannot be
    /// serialised.
    pub fn to_message(&self) -> Result<Value, ProtocolError> {
        let payload = match self {
            Self::GenerateJob { prompt } => json!({ "prompt": prompt }),
            Self::SetTask(task) => serde_json::to_value(task)
                .map_err(|err| ProtocolError::Encode(err.to_string()))?,
            Self::GetState | Self::ClearState => json!({}),
        };
        Ok(json!({ "type": self.message_type().as_str(), "payload": payload }))
    }
}

/// Reply to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub ok: bool,
    /// Result value on success, when the request produces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Builds a success reply.
    #[must_use]
    pub const fn success(result: Option<Value>) -> Self {
        Self {
            ok: true,
            result,
            error: None,
        }
    }

    /// Builds a failure reply.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Splits the reply into its result or error message.
    ///
    /// # Errors
    ///
    /// Returns the error message of a failure reply; a failure without a
    /// message yields `"Unknown error from background."`.
    pub fn into_result(self) -> Result<Option<Value>, String> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "Unknown error from background.".to_owned()))
        }
    }
}
