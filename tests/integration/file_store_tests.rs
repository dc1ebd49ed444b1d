//! [`FileKeyValueStore`] persistence in a temporary directory.

use std::sync::Arc;

use camino::Utf8PathBuf;
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use sona_job_builder::task::adapters::file::FileKeyValueStore;
use sona_job_builder::task::ports::{KeyValueStore, StoreKey};
use sona_job_builder::task::services::{CreateTaskRequest, TaskLifecycleService, TaskRecords};
use tempfile::TempDir;

use crate::integration::helpers::{PHONE_NUMBER_ID, PROMPT, WORKFLOW_ID, refund_job};

const STORE_FILE: &str = "job-builder-store.json";

struct StoreDir {
    _temp: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn store_dir() -> StoreDir {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().join("state")).expect("UTF-8 temp path");
    StoreDir { _temp: temp, path }
}

fn create_request() -> CreateTaskRequest {
    CreateTaskRequest::new(PHONE_NUMBER_ID, WORKFLOW_ID, PROMPT)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn records_survive_reopening(store_dir: StoreDir) -> eyre::Result<()> {
    let store = Arc::new(FileKeyValueStore::open(&store_dir.path)?);
    let service = TaskLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock));
    let created = service.create(create_request()).await?;
    TaskRecords::new(Arc::clone(&store))
        .save_job(&refund_job(), PROMPT)
        .await?;
    drop(service);
    drop(store);

    let reopened = Arc::new(FileKeyValueStore::open(&store_dir.path)?);
    let snapshot = TaskRecords::new(reopened).load().await?;

    ensure!(snapshot.task == Some(created));
    ensure!(snapshot.job == Some(refund_job()));
    ensure!(snapshot.raw_prompt.as_deref() == Some(PROMPT));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn foreign_keys_are_preserved(store_dir: StoreDir) -> eyre::Result<()> {
    std::fs::create_dir_all(&store_dir.path)?;
    std::fs::write(
        store_dir.path.join(STORE_FILE),
        json!({ "otherExtensionSetting": { "enabled": true } }).to_string(),
    )?;
    let store = Arc::new(FileKeyValueStore::open(&store_dir.path)?);

    store
        .set([(StoreKey::OpenAiKey, json!("sk-test"))].into())
        .await?;
    TaskRecords::new(Arc::clone(&store)).clear().await?;

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(
        store_dir.path.join(STORE_FILE),
    )?)?;
    ensure!(raw.pointer("/otherExtensionSetting/enabled") == Some(&json!(true)));
    ensure!(raw.pointer("/openAiKey") == Some(&json!("sk-test")));
    ensure!(raw.pointer("/quoJobBuilderTask").is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_file_reads_as_empty_store(store_dir: StoreDir) -> eyre::Result<()> {
    std::fs::create_dir_all(&store_dir.path)?;
    std::fs::write(store_dir.path.join(STORE_FILE), "")?;
    let store = FileKeyValueStore::open(&store_dir.path)?;

    ensure!(store.get(&StoreKey::AUTOMATION).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn writes_and_removals_are_announced(store_dir: StoreDir) -> eyre::Result<()> {
    let store = Arc::new(FileKeyValueStore::open(&store_dir.path)?);
    let mut changes = store.subscribe();
    let service = TaskLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock));

    service.create(create_request()).await?;
    service.clear().await?;

    let cleared_job = changes.recv().await?;
    ensure!(cleared_job.touches(&[StoreKey::JobJson, StoreKey::RawPrompt]));
    ensure!(!cleared_job.touches(&[StoreKey::Task]));
    let created = changes.recv().await?;
    ensure!(created.keys() == [StoreKey::Task]);
    let cleared = changes.recv().await?;
    ensure!(cleared.keys() == StoreKey::AUTOMATION);
    ensure!(changes.try_recv().is_err());

    let current = service.current().await?;
    ensure!(current.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_file_is_reported_as_unavailable(store_dir: StoreDir) -> eyre::Result<()> {
    std::fs::create_dir_all(&store_dir.path)?;
    std::fs::write(store_dir.path.join(STORE_FILE), "{ not json")?;
    let store = FileKeyValueStore::open(&store_dir.path)?;

    let err = store
        .get(&[StoreKey::Task])
        .await
        .err()
        .ok_or_eyre("malformed store file must not read")?;

    ensure!(err.to_string().starts_with("store unavailable"));
    Ok(())
}
