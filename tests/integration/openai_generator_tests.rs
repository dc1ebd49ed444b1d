//! [`OpenAiJobGenerator`] against a local chat-completion stub.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::post,
};
use eyre::{OptionExt, bail, ensure};
use rstest::rstest;
use serde_json::{Value, json};
use sona_job_builder::config::GenerationConfig;
use sona_job_builder::generation::adapters::openai::OpenAiJobGenerator;
use sona_job_builder::generation::ports::{GenerationError, JobGenerator};
use sona_job_builder::task::adapters::memory::InMemoryKeyValueStore;
use sona_job_builder::task::ports::{KeyValueStore, StoreKey};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::integration::helpers::{PROMPT, refund_job};

#[derive(Debug, Clone)]
struct Captured {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

struct StubEndpoint {
    url: String,
    captured: Arc<Mutex<Vec<Captured>>>,
    server: JoinHandle<std::io::Result<()>>,
}

impl StubEndpoint {
    async fn spawn(status: StatusCode, reply: impl Into<String>) -> eyre::Result<Self> {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            reply: reply.into(),
            captured: Arc::clone(&captured),
        };
        let app = Router::new()
            .route("/v1/chat/completions", post(complete))
            .with_state(state);
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let url = format!("http://{}/v1/chat/completions", listener.local_addr()?);
        let server = tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(Self {
            url,
            captured,
            server,
        })
    }

    fn requests(&self) -> Vec<Captured> {
        self.captured.lock().expect("capture lock").clone()
    }

    fn config(&self) -> GenerationConfig {
        GenerationConfig {
            endpoint: self.url.clone(),
            ..GenerationConfig::default()
        }
    }
}

impl Drop for StubEndpoint {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn complete(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    state
        .captured
        .lock()
        .expect("capture lock")
        .push(Captured {
            authorization,
            body,
        });
    (state.status, state.reply.clone())
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

async fn store_with_key(key: &str) -> eyre::Result<Arc<InMemoryKeyValueStore>> {
    let store = Arc::new(InMemoryKeyValueStore::new());
    store
        .set([(StoreKey::OpenAiKey, json!(key))].into())
        .await?;
    Ok(store)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn posts_prompt_with_bearer_credential() -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(
        StatusCode::OK,
        completion(&serde_json::to_string(&refund_job())?),
    )
    .await?;
    let generator = OpenAiJobGenerator::new(store_with_key("sk-test").await?, endpoint.config())?;

    let job = generator.generate_job(PROMPT).await?;

    ensure!(job == refund_job());
    let requests = endpoint.requests();
    ensure!(requests.len() == 1);
    let request = requests.first().ok_or_eyre("request captured")?;
    ensure!(request.authorization.as_deref() == Some("Bearer sk-test"));
    let body = &request.body;
    ensure!(body.pointer("/model") == Some(&json!("gpt-4o-mini")));
    ensure!(body.pointer("/response_format/type") == Some(&json!("json_object")));
    ensure!(body.pointer("/messages/0/role") == Some(&json!("system")));
    ensure!(body.pointer("/messages/1") == Some(&json!({ "role": "user", "content": PROMPT })));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn credential_is_trimmed() -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(
        StatusCode::OK,
        completion(&serde_json::to_string(&refund_job())?),
    )
    .await?;
    let generator =
        OpenAiJobGenerator::new(store_with_key("  sk-padded \n").await?, endpoint.config())?;

    generator.generate_job(PROMPT).await?;

    let requests = endpoint.requests();
    let request = requests.first().ok_or_eyre("request captured")?;
    ensure!(request.authorization.as_deref() == Some("Bearer sk-padded"));
    Ok(())
}

#[rstest]
#[case::absent(None)]
#[case::blank(Some("   "))]
#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_sends_nothing(#[case] key: Option<&str>) -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(StatusCode::OK, completion("{}")).await?;
    let store = match key {
        Some(value) => store_with_key(value).await?,
        None => Arc::new(InMemoryKeyValueStore::new()),
    };
    let generator = OpenAiJobGenerator::new(store, endpoint.config())?;

    let result = generator.generate_job(PROMPT).await;

    ensure!(matches!(result, Err(GenerationError::MissingCredential)));
    ensure!(endpoint.requests().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_request_reports_status_and_body() -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(StatusCode::UNAUTHORIZED, "invalid api key").await?;
    let generator = OpenAiJobGenerator::new(store_with_key("sk-bad").await?, endpoint.config())?;

    let err = match generator.generate_job(PROMPT).await {
        Err(err) => err,
        Ok(job) => bail!("expected a rejection, got {job:?}"),
    };

    let GenerationError::Status { status, body } = &err else {
        bail!("expected a status error, got {err:?}");
    };
    ensure!(*status == 401);
    ensure!(body == "invalid api key");
    ensure!(err.to_string().contains("401"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn long_error_bodies_are_truncated() -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(64)).await?;
    let config = GenerationConfig {
        max_error_body_chars: 10,
        ..endpoint.config()
    };
    let generator = OpenAiJobGenerator::new(store_with_key("sk-test").await?, config)?;

    match generator.generate_job(PROMPT).await {
        Err(GenerationError::Status { status: 500, body }) => ensure!(body == "x".repeat(10)),
        other => bail!("expected a truncated status error, got {other:?}"),
    }
    Ok(())
}

#[rstest]
#[case::no_choices(json!({ "choices": [] }).to_string())]
#[case::blank_content(completion("   "))]
#[case::null_content(json!({ "choices": [{ "message": { "content": null } }] }).to_string())]
#[tokio::test(flavor = "multi_thread")]
async fn empty_completions_are_rejected(#[case] reply: String) -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(StatusCode::OK, reply).await?;
    let generator = OpenAiJobGenerator::new(store_with_key("sk-test").await?, endpoint.config())?;

    let result = generator.generate_job(PROMPT).await;

    ensure!(matches!(result, Err(GenerationError::EmptyContent)));
    Ok(())
}

#[rstest]
#[case::prose(completion("Here is your job!"))]
#[case::missing_trigger(completion(r#"{"jobName":"Refund Job","instructions":"x"}"#))]
#[case::not_a_completion("<html>gateway</html>".to_owned())]
#[tokio::test(flavor = "multi_thread")]
async fn unusable_content_is_unparseable(#[case] reply: String) -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(StatusCode::OK, reply).await?;
    let generator = OpenAiJobGenerator::new(store_with_key("sk-test").await?, endpoint.config())?;

    let result = generator.generate_job(PROMPT).await;

    ensure!(matches!(result, Err(GenerationError::Unparseable(_))));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn optional_fields_default_to_empty() -> eyre::Result<()> {
    let endpoint = StubEndpoint::spawn(
        StatusCode::OK,
        completion(r#"{"jobName":"Callback","trigger":"caller wants a callback"}"#),
    )
    .await?;
    let generator = OpenAiJobGenerator::new(store_with_key("sk-test").await?, endpoint.config())?;

    let job = generator.generate_job(PROMPT).await?;

    ensure!(job.job_name() == "Callback");
    ensure!(job.description().is_empty());
    ensure!(job.instructions().is_empty());
    Ok(())
}
