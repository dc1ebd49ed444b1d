//! Full runs: task creation, navigation, generation through the router and
//! modal population, all sharing one store.

use std::sync::Arc;
use std::time::Duration;

use eyre::{OptionExt, bail, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use sona_job_builder::automation::domain::RunOutcome;
use sona_job_builder::automation::services::{PageContext, SonaNavigator, WorkflowAutomator};
use sona_job_builder::generation::adapters::scripted::ScriptedJobGenerator;
use sona_job_builder::generation::ports::GenerationError;
use sona_job_builder::page::adapters::memory::InMemoryPage;
use sona_job_builder::router::services::{MessageRouter, RoutedJobGenerator, RouterClient};
use sona_job_builder::task::adapters::memory::InMemoryKeyValueStore;
use sona_job_builder::task::domain::{Task, TaskState};
use sona_job_builder::task::ports::KeyValueStore;
use sona_job_builder::task::services::{CreateTaskRequest, TaskLifecycleService, TaskRecords};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::integration::helpers::{
    PHONE_NUMBER_ID, PROMPT, WAIT_STEP, WORKFLOW_ID, builder_page, fast_config, refund_job,
    settings_page, value_of,
};

type Navigator = SonaNavigator<InMemoryKeyValueStore, InMemoryPage, DefaultClock>;
type Automator =
    WorkflowAutomator<InMemoryKeyValueStore, InMemoryPage, RoutedJobGenerator, DefaultClock>;

struct Deployment {
    store: Arc<InMemoryKeyValueStore>,
    generator: ScriptedJobGenerator,
    client: RouterClient,
    router: JoinHandle<()>,
    lifecycle: TaskLifecycleService<InMemoryKeyValueStore, DefaultClock>,
}

impl Deployment {
    fn navigator(&self, page: &Arc<InMemoryPage>) -> Navigator {
        SonaNavigator::new(self.context(page), fast_config())
    }

    fn automator(&self, page: &Arc<InMemoryPage>) -> Automator {
        WorkflowAutomator::new(
            self.context(page),
            Arc::new(RoutedJobGenerator::new(self.client.clone())),
            fast_config(),
        )
    }

    fn context(
        &self,
        page: &Arc<InMemoryPage>,
    ) -> PageContext<InMemoryKeyValueStore, InMemoryPage, DefaultClock> {
        PageContext::new(
            Arc::clone(&self.store),
            Arc::clone(page),
            Arc::new(DefaultClock),
        )
    }

    async fn start_task(&self) -> eyre::Result<Task> {
        self.lifecycle
            .create(CreateTaskRequest::new(PHONE_NUMBER_ID, WORKFLOW_ID, PROMPT))
            .await?;
        Ok(self.lifecycle.request_navigation().await?)
    }

    async fn task(&self) -> eyre::Result<Task> {
        TaskRecords::new(Arc::clone(&self.store))
            .load_task()
            .await?
            .ok_or_eyre("task present")
    }
}

impl Drop for Deployment {
    fn drop(&mut self) {
        self.router.abort();
    }
}

#[fixture]
fn deployment() -> Deployment {
    let store = Arc::new(InMemoryKeyValueStore::new());
    let generator = ScriptedJobGenerator::new();
    let router = Arc::new(MessageRouter::new(
        Arc::clone(&store),
        Arc::new(generator.clone()),
    ));
    let (outbox, inbox) = mpsc::channel(8);
    let serving = tokio::spawn(async move { router.serve(inbox).await });
    Deployment {
        lifecycle: TaskLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock)),
        store,
        generator,
        client: RouterClient::new(outbox),
        router: serving,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn prompt_becomes_a_populated_job(deployment: Deployment) -> eyre::Result<()> {
    deployment.generator.push(Ok(refund_job()));
    let settings = Arc::new(settings_page());
    let builder = Arc::new(builder_page());
    let started = deployment.start_task().await?;

    let navigated = deployment.navigator(&settings).on_page_load().await?;
    ensure!(matches!(
        navigated,
        RunOutcome::Advanced {
            state: TaskState::OpenSonaManage,
            ..
        }
    ));

    let automated = deployment.automator(&builder).on_page_load().await?;
    ensure!(matches!(
        automated,
        RunOutcome::Advanced {
            state: TaskState::Completed,
            ..
        }
    ));

    let finished = deployment.task().await?;
    ensure!(finished.id() == started.id());
    ensure!(finished.lease().is_none());
    ensure!(deployment.generator.prompts() == vec![PROMPT.to_owned()]);
    ensure!(value_of(&builder, "job-name").await.as_deref() == Some("Refund Job"));
    ensure!(
        value_of(&builder, "job-description").await.as_deref()
            == Some("Handles refund requests")
    );
    ensure!(
        value_of(&builder, "job-trigger").await.as_deref() == Some("caller asks for a refund")
    );
    ensure!(
        value_of(&builder, "job-instructions").await.as_deref()
            == Some(refund_job().instructions())
    );

    let state = deployment
        .client
        .state()
        .await?
        .into_result()
        .map_err(|message| eyre::eyre!(message))?
        .ok_or_eyre("state result")?;
    ensure!(state.pointer("/quoJobBuilderJobJson/jobName") == Some(&serde_json::json!("Refund Job")));
    ensure!(state.pointer("/quoJobBuilderPrompt") == Some(&serde_json::json!(PROMPT)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn watching_automator_picks_up_navigation(deployment: Deployment) -> eyre::Result<()> {
    deployment.generator.push(Ok(refund_job()));
    let settings = Arc::new(settings_page());
    let builder = Arc::new(builder_page());
    let automator = Arc::new(deployment.automator(&builder));
    let changes = deployment.store.subscribe();
    let watching = Arc::clone(&automator);
    let watcher = tokio::spawn(async move { watching.watch(changes).await });

    deployment.start_task().await?;
    deployment.navigator(&settings).activate().await?;

    let finished = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let task = deployment.task().await?;
            if task.state().is_terminal() {
                return Ok::<_, eyre::Report>(task);
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    })
    .await??;
    watcher.abort();

    ensure!(finished.state() == TaskState::Completed);
    ensure!(deployment.generator.calls() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generation_failure_is_recorded_on_the_task(deployment: Deployment) -> eyre::Result<()> {
    deployment
        .generator
        .push(Err(GenerationError::MissingCredential));
    let settings = Arc::new(settings_page());
    let builder = Arc::new(builder_page());
    deployment.start_task().await?;

    deployment.navigator(&settings).activate().await?;
    let outcome = deployment.automator(&builder).activate().await?;

    let RunOutcome::Failed { message, .. } = outcome else {
        bail!("expected the run to fail, got {outcome:?}");
    };
    ensure!(message.contains("openAiKey"));
    let failed = deployment.task().await?;
    ensure!(failed.state() == TaskState::Failed);
    ensure!(failed.error() == Some(message.as_str()));
    ensure!(failed.lease().is_none());
    ensure!(value_of(&builder, "job-name").await.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn new_prompt_replaces_cached_job(deployment: Deployment) -> eyre::Result<()> {
    let stale = sona_job_builder::task::domain::JobFields::new(
        "Stale Job",
        "",
        "old trigger",
        "",
    )?;
    TaskRecords::new(Arc::clone(&deployment.store))
        .save_job(&stale, "an older transcript")
        .await?;
    deployment.generator.push(Ok(refund_job()));
    let settings = Arc::new(settings_page());
    let builder = Arc::new(builder_page());

    deployment.start_task().await?;
    deployment.navigator(&settings).activate().await?;
    deployment.automator(&builder).activate().await?;

    ensure!(deployment.generator.prompts() == vec![PROMPT.to_owned()]);
    ensure!(value_of(&builder, "job-name").await.as_deref() == Some("Refund Job"));
    Ok(())
}
