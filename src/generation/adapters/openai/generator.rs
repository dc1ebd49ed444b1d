//! Chat-completion request producing job fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::generation::ports::{GenerationError, GenerationResult, JobGenerator};
use crate::task::domain::JobFields;
use crate::task::ports::{KeyValueStore, StoreKey};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageResponse>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// [`JobGenerator`] backed by an OpenAI-compatible chat-completion API.
///
/// The bearer credential is read from the store's `openAiKey` slot on every
/// call, so it can be provisioned after start-up.
#[derive(Debug)]
pub struct OpenAiJobGenerator<S: KeyValueStore> {
    store: Arc<S>,
    client: reqwest::Client,
    config: GenerationConfig,
}

impl<S: KeyValueStore> OpenAiJobGenerator<S> {
    /// Creates a generator using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(store: Arc<S>, config: GenerationConfig) -> GenerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(GenerationError::transport)?;
        Ok(Self {
            store,
            client,
            config,
        })
    }

    async fn credential(&self) -> GenerationResult<String> {
        let entries = self.store.get(&[StoreKey::OpenAiKey]).await?;
        entries
            .get(&StoreKey::OpenAiKey)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
            .ok_or(GenerationError::MissingCredential)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl<S: KeyValueStore> JobGenerator for OpenAiJobGenerator<S> {
    async fn generate_job(&self, prompt: &str) -> GenerationResult<JobFields> {
        let credential = self.credential().await?;
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        info!(model = %self.config.model, "requesting job generation");
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await
            .map_err(GenerationError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(GenerationError::transport)?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "job generation request rejected");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, self.config.max_error_body_chars),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| GenerationError::Unparseable(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyContent)?;

        serde_json::from_str(&content).map_err(|err| GenerationError::Unparseable(err.to_string()))
    }
}
