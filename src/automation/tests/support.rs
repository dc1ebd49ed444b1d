//! Shared fixtures: seeded tasks, a recording store and builder pages.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use url::Url;

use crate::automation::services::PageContext;
use crate::page::adapters::memory::{ElementSpec, InMemoryPage};
use crate::page::domain::NodeId;
use crate::page::ports::Page;
use crate::task::{
    adapters::memory::InMemoryKeyValueStore,
    domain::{JobFields, PhoneNumberId, Task, TaskState, WorkflowDefinitionId},
    ports::{KeyValueStore, StoreChange, StoreEntries, StoreKey, StoreResult},
    services::TaskRecords,
};
use crate::test_support::ManualClock;

pub const PROMPT: &str = "caller asked about refunds";

pub const BUILDER_URL: &str =
    "https://my.quo.com/settings/phone-numbers/PN1/workflow-builder?workflowDefinitionId=WD1";

/// Builds a task that walked the happy path up to `state`.
pub fn task_in(state: TaskState, clock: &ManualClock) -> Task {
    let mut task = Task::new(
        PhoneNumberId::new("PN1").expect("valid phone number id"),
        WorkflowDefinitionId::new("WD1").expect("valid workflow id"),
        PROMPT,
        clock,
    );
    if state == TaskState::Failed {
        task.fail("earlier failure", clock).expect("fresh task can fail");
        return task;
    }
    let path = [
        TaskState::NavigatingToSona,
        TaskState::OpenSonaManage,
        TaskState::WorkflowReady,
        TaskState::GeneratingJob,
        TaskState::JobReady,
        TaskState::Completed,
    ];
    for next in path {
        if task.state() == state {
            break;
        }
        task.transition_to(next, clock).expect("happy path transition");
    }
    task
}

pub fn refund_job() -> JobFields {
    JobFields::new(
        "Refund Job",
        "",
        "refund requested",
        "Confirm the order number.\nExplain the refund timeline.",
    )
    .expect("valid job fields")
}

/// Store that records the state of every task it is asked to write.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryKeyValueStore,
    states: Arc<Mutex<Vec<TaskState>>>,
    writes: Arc<Mutex<usize>>,
}

impl RecordingStore {
    pub fn states(&self) -> Vec<TaskState> {
        self.states.lock().expect("states lock").clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().expect("writes lock")
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, keys: &[StoreKey]) -> StoreResult<StoreEntries> {
        self.inner.get(keys).await
    }

    async fn set(&self, entries: StoreEntries) -> StoreResult<()> {
        *self.writes.lock().expect("writes lock") += 1;
        if let Some(task) = entries.get(&StoreKey::Task) {
            let task: Task = serde_json::from_value(task.clone()).expect("task encodes");
            self.states.lock().expect("states lock").push(task.state());
        }
        self.inner.set(entries).await
    }

    async fn remove(&self, keys: &[StoreKey]) -> StoreResult<()> {
        *self.writes.lock().expect("writes lock") += 1;
        self.inner.remove(keys).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.subscribe()
    }
}

/// Store, page and clock for one simulated page context.
pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub page: Arc<InMemoryPage>,
    pub clock: Arc<ManualClock>,
    pub context: PageContext<RecordingStore, InMemoryPage, ManualClock>,
}

impl Harness {
    pub fn new(page: InMemoryPage) -> Self {
        let store = Arc::new(RecordingStore::default());
        let page = Arc::new(page);
        let clock = Arc::new(ManualClock::default());
        let context = PageContext::new(Arc::clone(&store), Arc::clone(&page), Arc::clone(&clock));
        Self {
            store,
            page,
            clock,
            context,
        }
    }

    pub fn records(&self) -> TaskRecords<RecordingStore> {
        TaskRecords::new(Arc::clone(&self.store))
    }

    /// Seeds the store through the inner store so the seed is not recorded.
    pub async fn seed(&self, task: &Task, job: Option<&JobFields>) {
        let records = TaskRecords::new(Arc::new(self.store.inner.clone()));
        records.save_task(task).await.expect("seed task");
        if let Some(fields) = job {
            records.save_job(fields, PROMPT).await.expect("seed job");
        }
    }

    pub async fn task(&self) -> Task {
        self.records()
            .load_task()
            .await
            .expect("task readable")
            .expect("task present")
    }

    pub async fn value_of(&self, dom_id: &str) -> Option<String> {
        let node = self.node_by_dom_id(dom_id).await?;
        self.page.value(node).expect("page readable")
    }

    pub async fn node_by_dom_id(&self, dom_id: &str) -> Option<NodeId> {
        let snapshot = self.page.snapshot().await.expect("snapshot");
        snapshot.find_by_dom_id(dom_id).map(|element| element.id())
    }
}

pub fn page_at(url: &str) -> InMemoryPage {
    InMemoryPage::new(Url::parse(url).expect("valid url"))
}

/// What the job dialog contains once revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMarkup {
    /// Labelled name/description/trigger fields and a rich-text editor.
    Complete,
    /// As `Complete`, without any trigger field.
    WithoutTrigger,
    /// Unlabelled fields found by attributes; instructions in a textarea.
    AttributeOnly,
}

fn dialog(markup: DialogMarkup) -> ElementSpec {
    let base = ElementSpec::new("div").attr("role", "dialog");
    match markup {
        DialogMarkup::Complete | DialogMarkup::WithoutTrigger => {
            let labelled = base
                .child(ElementSpec::new("label").attr("for", "job-name").text("Job Name"))
                .child(ElementSpec::new("input").attr("id", "job-name"))
                .child(
                    ElementSpec::new("label")
                        .text("Description")
                        .child(ElementSpec::new("textarea").attr("id", "job-description")),
                );
            let with_trigger = if markup == DialogMarkup::Complete {
                labelled
                    .child(
                        ElementSpec::new("label")
                            .attr("for", "job-trigger")
                            .text("  TRIGGER  "),
                    )
                    .child(ElementSpec::new("textarea").attr("id", "job-trigger"))
            } else {
                labelled
            };
            with_trigger.child(
                ElementSpec::new("div")
                    .attr("id", "job-instructions")
                    .attr("contenteditable", "true")
                    .attr("role", "textbox"),
            )
        }
        DialogMarkup::AttributeOnly => base
            .child(
                ElementSpec::new("input")
                    .attr("id", "job-name")
                    .attr("placeholder", "Job name"),
            )
            .child(
                ElementSpec::new("textarea")
                    .attr("id", "job-trigger")
                    .attr("name", "trigger"),
            )
            .child(
                ElementSpec::new("textarea")
                    .attr("id", "job-instructions")
                    .attr("aria-label", "Job Instructions"),
            ),
    }
}

/// Buttons of the builder page the automator clicks.
#[derive(Debug, Clone, Copy)]
pub struct BuilderButtons {
    pub voice_agent: NodeId,
    pub side_navigation: NodeId,
    pub add_job: NodeId,
    pub create_job: NodeId,
}

/// Lays out a workflow builder whose modal opens through the two buttons.
pub fn builder_page(markup: DialogMarkup) -> (InMemoryPage, BuilderButtons) {
    let page = page_at(BUILDER_URL);
    let body = page.root().expect("body");
    let voice_agent = page
        .append_to_body(ElementSpec::new("div").attr("data-block-type", "voiceAgent"))
        .expect("voice agent block");
    let side_navigation = page
        .append_to_body(
            ElementSpec::new("button").attr("data-sentry-source-file", "SideNavigation.tsx"),
        )
        .expect("side navigation");
    let add_job = page
        .append_to_body(ElementSpec::new("button").attr("data-sentry-source-file", "CustomJobsV1.tsx"))
        .expect("add job button");
    let create_job = page
        .append_to_body(
            ElementSpec::new("button")
                .attr("id", "create-job")
                .attr("data-sentry-source-file", "AddOrLinkCustomJobsV1Command.tsx"),
        )
        .expect("create job button");
    page.reveal_on_click(create_job, body, dialog(markup))
        .expect("reveal dialog");
    (
        page,
        BuilderButtons {
            voice_agent,
            side_navigation,
            add_job,
            create_job,
        },
    )
}
