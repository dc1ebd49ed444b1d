//! Driver that creates and fills the job inside the workflow builder.

use mockable::Clock;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use super::affordances::{self, JobFormLocators};
use super::{AutomationResult, DriverSession, PageContext, SingleFlight};
use crate::automation::domain::{
    AutomationError, DriverKind, JobPlan, RunDecision, RunOutcome, SkipReason,
};
use crate::config::AutomationConfig;
use crate::generation::ports::JobGenerator;
use crate::page::{
    domain::{NodeId, Selector},
    ports::Page,
    services::{
        LocatorChain, click_element, set_controlled_input_value, set_editable_region_value,
        wait_for_selector,
    },
};
use crate::task::{
    domain::{JobFields, Task, TaskState},
    ports::{KeyValueStore, StoreChange, StoreKey},
};

/// Store keys whose changes re-trigger the automator.
const WATCHED_KEYS: [StoreKey; 2] = [StoreKey::Task, StoreKey::JobJson];

/// Drives the workflow builder for a task in one of the workflow-active
/// states.
///
/// Cached job fields are always reused; the generator is only called when
/// none are stored.
#[derive(Debug)]
pub struct WorkflowAutomator<S, P, G, C>
where
    S: KeyValueStore,
    P: Page,
    G: JobGenerator,
    C: Clock + Send + Sync,
{
    context: PageContext<S, P, C>,
    generator: Arc<G>,
    config: AutomationConfig,
    form: JobFormLocators,
    flight: SingleFlight,
}

impl<S, P, G, C> WorkflowAutomator<S, P, G, C>
where
    S: KeyValueStore,
    P: Page,
    G: JobGenerator,
    C: Clock + Send + Sync,
{
    /// Creates an automator for `context`.
    #[must_use]
    pub fn new(context: PageContext<S, P, C>, generator: Arc<G>, config: AutomationConfig) -> Self {
        Self {
            context,
            generator,
            config,
            form: JobFormLocators::default(),
            flight: SingleFlight::new(),
        }
    }

    /// Runs the page-load activation once per page context.
    ///
    /// # Errors
    ///
    /// As for [`WorkflowAutomator::activate`].
    pub async fn on_page_load(&self) -> AutomationResult<RunOutcome> {
        if !self.context.init_guard().try_claim(DriverKind::Workflow) {
            debug!("workflow automator already initialised in this page context");
            return Ok(RunOutcome::Skipped(SkipReason::AlreadyInitialized));
        }
        self.activate().await
    }

    /// Re-runs [`WorkflowAutomator::activate`] for every change touching the
    /// task or the cached job, one at a time, until the feed closes.
    ///
    /// Run errors are logged and do not stop the loop.
    pub async fn watch(&self, mut changes: broadcast::Receiver<StoreChange>) {
        loop {
            match changes.recv().await {
                Ok(change) if change.touches(&WATCHED_KEYS) => self.activate_logged().await,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "store change feed lagged");
                    self.activate_logged().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn activate_logged(&self) {
        match self.activate().await {
            Ok(outcome) => debug!(?outcome, "workflow automator activation finished"),
            Err(err) => error!(error = %err, "workflow automator activation failed"),
        }
    }

    /// Acts on the current task if it is in a workflow-active state.
    ///
    /// Failures inside the run are recorded on the task and reported as
    /// [`RunOutcome::Failed`]. Outside the active states nothing is written
    /// and the page is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the records cannot be read or
    /// a failure cannot be recorded.
    pub async fn activate(&self) -> AutomationResult<RunOutcome> {
        let Some(_permit) = self.flight.try_acquire() else {
            return Ok(RunOutcome::Skipped(SkipReason::AlreadyRunning));
        };
        let task = self.context.records().load_task().await?;
        match (RunDecision::for_workflow(task.as_ref()), task) {
            (RunDecision::Automate(_), Some(task)) => self.automate(task).await,
            (RunDecision::Skip(reason), _) => {
                debug!(?reason, "workflow automator idle");
                Ok(RunOutcome::Skipped(reason))
            }
            _ => Ok(RunOutcome::Skipped(SkipReason::NoTask)),
        }
    }

    async fn automate(&self, task: Task) -> AutomationResult<RunOutcome> {
        let session = DriverSession::begin(
            DriverKind::Workflow,
            self.context.records(),
            Arc::clone(self.context.clock()),
            task,
            self.config.lease_ttl(),
        )
        .await?;
        let Some(mut owned) = session else {
            return Ok(RunOutcome::Skipped(SkipReason::LeaseHeld));
        };
        info!(task_id = %owned.task_id(), state = owned.state().as_str(), "driving workflow builder");
        let result = self.run(&mut owned).await;
        owned.conclude(result).await
    }

    async fn run(&self, session: &mut DriverSession<S, C>) -> AutomationResult<TaskState> {
        let plan = JobPlan::from_cache(self.context.records().load_job().await?);
        if session.state() == TaskState::OpenSonaManage {
            session.advance(TaskState::WorkflowReady).await?;
        }

        self.select_voice_agent(session).await?;
        let job = self.resolve_job(session, plan).await?;
        let dialog = self.open_job_modal(session).await?;
        self.populate(session, dialog, &job).await?;
        self.confirm(session).await?;

        session.advance(TaskState::Completed).await?;
        info!(task_id = %session.task_id(), job_name = job.job_name(), "job created");
        Ok(TaskState::Completed)
    }

    async fn select_voice_agent(&self, session: &mut DriverSession<S, C>) -> AutomationResult<()> {
        let page = self.page();
        let block = wait_for_selector(
            page,
            None,
            &affordances::voice_agent_block(),
            self.config.voice_agent_timeout(),
        )
        .await?;
        session.checkpoint().await?;
        click_element(page, block).await?;
        debug!("voice agent block selected");
        tokio::time::sleep(self.config.short_settle()).await;

        if self.click_if_present(session, &affordances::side_navigation_button()).await? {
            debug!("job side navigation opened");
            tokio::time::sleep(self.config.short_settle()).await;
        }
        Ok(())
    }

    async fn resolve_job(
        &self,
        session: &mut DriverSession<S, C>,
        plan: JobPlan,
    ) -> AutomationResult<JobFields> {
        match plan {
            JobPlan::Cached(job) => {
                if session.state() == TaskState::GeneratingJob {
                    session.advance(TaskState::JobReady).await?;
                }
                debug!(task_id = %session.task_id(), "using cached job fields");
                Ok(job)
            }
            JobPlan::Generate => {
                if session.state() == TaskState::GeneratingJob {
                    session.renew().await?;
                } else {
                    session.advance(TaskState::GeneratingJob).await?;
                }
                let prompt = session.task().prompt().to_owned();
                info!(task_id = %session.task_id(), "requesting job generation");
                let job = self.generator.generate_job(&prompt).await?;

                session.checkpoint().await?;
                self.context.records().save_job(&job, &prompt).await?;
                session.advance(TaskState::JobReady).await?;
                Ok(job)
            }
        }
    }

    async fn open_job_modal(&self, session: &mut DriverSession<S, C>) -> AutomationResult<NodeId> {
        let page = self.page();
        let timeout = self.config.modal_timeout();

        let add_job = wait_for_selector(page, None, &affordances::add_job_button(), timeout).await?;
        session.checkpoint().await?;
        click_element(page, add_job).await?;
        debug!("add job clicked");
        tokio::time::sleep(self.config.short_settle()).await;

        let create_job =
            wait_for_selector(page, None, &affordances::create_job_button(), timeout).await?;
        session.checkpoint().await?;
        click_element(page, create_job).await?;
        debug!("create new job clicked");
        tokio::time::sleep(self.config.long_settle()).await;

        Ok(wait_for_selector(page, None, &affordances::job_dialog(), timeout).await?)
    }

    async fn populate(
        &self,
        session: &mut DriverSession<S, C>,
        dialog: NodeId,
        job: &JobFields,
    ) -> AutomationResult<()> {
        session.checkpoint().await?;

        let name = self
            .find_field(dialog, &self.form.name, "Job Name field")
            .await?
            .ok_or(AutomationError::ElementNotFound("Job Name field"))?;
        set_controlled_input_value(self.page(), name, job.job_name()).await?;
        debug!("job name filled");

        if let Some(description) = self
            .find_field(dialog, &self.form.description, "Description field")
            .await?
        {
            set_controlled_input_value(self.page(), description, job.description()).await?;
            debug!("description filled");
        }

        let trigger = self
            .find_field(dialog, &self.form.trigger, "Trigger field")
            .await?
            .ok_or(AutomationError::ElementNotFound("Trigger field"))?;
        set_controlled_input_value(self.page(), trigger, job.trigger()).await?;
        debug!("trigger filled");

        self.fill_instructions(dialog, job.instructions()).await
    }

    async fn fill_instructions(&self, dialog: NodeId, instructions: &str) -> AutomationResult<()> {
        let page = self.page();
        let snapshot = page.snapshot().await?;
        let found = self
            .form
            .instructions
            .locate(&snapshot, Some(dialog))
            .ok_or(AutomationError::ElementNotFound("Instructions editor"))?;
        let is_control = snapshot
            .element(found.node)
            .is_some_and(|element| matches!(element.tag(), "textarea" | "input"));
        if is_control {
            set_controlled_input_value(page, found.node, instructions).await?;
        } else {
            set_editable_region_value(page, found.node, instructions).await?;
        }
        debug!(strategy = found.strategy, "instructions filled");
        Ok(())
    }

    async fn confirm(&self, session: &mut DriverSession<S, C>) -> AutomationResult<()> {
        if self.click_if_present(session, &affordances::side_navigation_button()).await? {
            debug!("job creation confirmed through side navigation");
        }
        Ok(())
    }

    async fn find_field(
        &self,
        dialog: NodeId,
        chain: &LocatorChain,
        field: &'static str,
    ) -> AutomationResult<Option<NodeId>> {
        let snapshot = self.page().snapshot().await?;
        let found = chain.locate(&snapshot, Some(dialog));
        match found {
            Some(located) => debug!(field, strategy = located.strategy, "field located"),
            None => debug!(field, "field not located"),
        }
        Ok(found.map(|located| located.node))
    }

    async fn click_if_present(
        &self,
        session: &mut DriverSession<S, C>,
        selector: &Selector,
    ) -> AutomationResult<bool> {
        let snapshot = self.page().snapshot().await?;
        let Some(element) = snapshot.query(None, selector) else {
            return Ok(false);
        };
        let node = element.id();
        session.checkpoint().await?;
        click_element(self.page(), node).await?;
        Ok(true)
    }

    fn page(&self) -> &P {
        self.context.page().as_ref()
    }
}
