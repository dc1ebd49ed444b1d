//! Driver that opens the workflow builder for the task's phone number.

use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

use super::{AutomationResult, DriverSession, PageContext, SingleFlight, affordances};
use crate::automation::domain::{AutomationError, DriverKind, RunDecision, RunOutcome, SkipReason};
use crate::config::AutomationConfig;
use crate::page::{
    domain::Selector,
    ports::{Page, PageError},
    services::{LocatorChain, click_element, wait_for_condition},
};
use crate::task::{
    domain::{Task, TaskState, is_workflow_builder_url, workflow_builder_link},
    ports::KeyValueStore,
};

/// Moves a `navigatingToSona` task onto the workflow builder page.
///
/// Clicks the first manage affordance found on the current page, or
/// navigates to the deep link when there is none, then hands the task to
/// the workflow automator by writing `openSonaManage`.
#[derive(Debug)]
pub struct SonaNavigator<S, P, C>
where
    S: KeyValueStore,
    P: Page,
    C: Clock + Send + Sync,
{
    context: PageContext<S, P, C>,
    config: AutomationConfig,
    affordances: LocatorChain,
    flight: SingleFlight,
}

impl<S, P, C> SonaNavigator<S, P, C>
where
    S: KeyValueStore,
    P: Page,
    C: Clock + Send + Sync,
{
    /// Creates a navigator for `context`.
    #[must_use]
    pub fn new(context: PageContext<S, P, C>, config: AutomationConfig) -> Self {
        Self {
            context,
            config,
            affordances: affordances::manage_affordances(),
            flight: SingleFlight::new(),
        }
    }

    /// Runs the page-load activation once per page context.
    ///
    /// # Errors
    ///
    /// As for [`SonaNavigator::activate`].
    pub async fn on_page_load(&self) -> AutomationResult<RunOutcome> {
        if !self.context.init_guard().try_claim(DriverKind::Navigator) {
            debug!("navigator already initialised in this page context");
            return Ok(RunOutcome::Skipped(SkipReason::AlreadyInitialized));
        }
        self.activate().await
    }

    /// Acts on the current task if it is waiting for navigation.
    ///
    /// Failures inside the run are recorded on the task and reported as
    /// [`RunOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Store`] when the task cannot be read or a
    /// failure cannot be recorded.
    pub async fn activate(&self) -> AutomationResult<RunOutcome> {
        let Some(_permit) = self.flight.try_acquire() else {
            return Ok(RunOutcome::Skipped(SkipReason::AlreadyRunning));
        };
        let task = self.context.records().load_task().await?;
        match (RunDecision::for_navigator(task.as_ref()), task) {
            (RunDecision::Navigate, Some(current)) => self.navigate(current).await,
            (RunDecision::Skip(reason), _) => {
                debug!(?reason, "navigator idle");
                Ok(RunOutcome::Skipped(reason))
            }
            _ => Ok(RunOutcome::Skipped(SkipReason::NoTask)),
        }
    }

    async fn navigate(&self, task: Task) -> AutomationResult<RunOutcome> {
        let session = DriverSession::begin(
            DriverKind::Navigator,
            self.context.records(),
            Arc::clone(self.context.clock()),
            task,
            self.config.lease_ttl(),
        )
        .await?;
        let Some(mut owned) = session else {
            return Ok(RunOutcome::Skipped(SkipReason::LeaseHeld));
        };
        let result = self.open_builder(&mut owned).await;
        owned.conclude(result).await
    }

    async fn open_builder(&self, session: &mut DriverSession<S, C>) -> AutomationResult<TaskState> {
        let page = self.context.page().as_ref();
        let snapshot = page.snapshot().await?;
        let task = session.checkpoint().await?.clone();

        if let Some(found) = self.affordances.locate(&snapshot, None) {
            info!(
                task_id = %task.id(),
                strategy = found.strategy,
                "opening workflow builder through manage affordance"
            );
            click_element(page, found.node).await?;
        } else {
            let link = workflow_builder_link(
                &self.config.app_base_url,
                task.phone_number_id(),
                task.workflow_definition_id(),
            )?;
            info!(task_id = %task.id(), %link, "no manage affordance found, navigating directly");
            page.navigate(&link).await.map_err(|err| match err {
                PageError::Navigation { message, .. } => AutomationError::Navigation(message),
                other => AutomationError::Page(other),
            })?;
        }

        session.handoff(TaskState::OpenSonaManage).await?;
        self.confirm_builder_opened(page).await;
        Ok(TaskState::OpenSonaManage)
    }

    async fn confirm_builder_opened(&self, page: &P) {
        let link = affordances::workflow_builder_link();
        let link_ref: &Selector = &link;
        let confirmed = wait_for_condition(
            "workflow builder",
            || async move {
                if is_workflow_builder_url(&page.current_url().await?) {
                    return Ok(Some(()));
                }
                let snapshot = page.snapshot().await?;
                Ok(snapshot.query(None, link_ref).map(|_| ()))
            },
            self.config.poll_interval(),
            self.config.navigation_confirm_timeout(),
        )
        .await;
        match confirmed {
            Ok(()) => debug!("workflow builder reached"),
            Err(err) => debug!(error = %err, "workflow builder not confirmed"),
        }
    }
}
