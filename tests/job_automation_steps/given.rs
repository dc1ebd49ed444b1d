//! Given steps for job automation BDD scenarios.

use super::world::{JobAutomationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use sona_job_builder::automation::domain::RunOutcome;
use sona_job_builder::generation::ports::GenerationError;
use sona_job_builder::page::adapters::memory::ElementSpec;
use sona_job_builder::task::{domain::JobFields, services::CreateTaskRequest};

#[given(
    r#"a task for phone number "{phone_number_id}" and workflow "{workflow_id}" awaiting navigation"#
)]
fn task_awaiting_navigation(
    world: &mut JobAutomationWorld,
    phone_number_id: String,
    workflow_id: String,
) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(
        phone_number_id,
        workflow_id,
        "Caller wants a refund for order 1042.",
    );
    run_async(world.lifecycle.create(request)).wrap_err("create task for scenario")?;
    run_async(world.lifecycle.request_navigation()).wrap_err("request navigation")?;
    Ok(())
}

#[given("the settings page offers the manage button")]
fn settings_page_offers_manage_button(
    world: &mut JobAutomationWorld,
) -> Result<(), eyre::Report> {
    let button = world.settings_page.append_to_body(
        ElementSpec::new("button").attr("data-sentry-source-file", "PhoneNumberManageButton.tsx"),
    )?;
    world.manage_button = Some(button);
    Ok(())
}

#[given("the settings page offers nothing to click")]
fn settings_page_offers_nothing(world: &mut JobAutomationWorld) -> Result<(), eyre::Report> {
    world
        .settings_page
        .append_to_body(ElementSpec::new("h1").text("Phone numbers"))?;
    Ok(())
}

#[given("the navigator has opened the builder")]
fn navigator_has_opened_builder(world: &mut JobAutomationWorld) -> Result<(), eyre::Report> {
    let outcome = run_async(world.navigator().activate()).wrap_err("run navigator")?;
    if !matches!(outcome, RunOutcome::Advanced { .. }) {
        return Err(eyre::eyre!("navigator did not advance: {outcome:?}"));
    }
    Ok(())
}

#[given(r#"the generator returns a job named "{name}" triggered by "{trigger}""#)]
fn generator_returns_job(
    world: &mut JobAutomationWorld,
    name: String,
    trigger: String,
) -> Result<(), eyre::Report> {
    let job = JobFields::new(name, "", trigger, "Confirm the order number.")?;
    world.generator.push(Ok(job));
    Ok(())
}

#[given(r#"a job named "{name}" triggered by "{trigger}" is already stored"#)]
fn job_already_stored(
    world: &mut JobAutomationWorld,
    name: String,
    trigger: String,
) -> Result<(), eyre::Report> {
    let job = JobFields::new(name, "", trigger, "")?;
    run_async(world.records().save_job(&job, "an earlier run"))
        .wrap_err("cache job fields for scenario")?;
    Ok(())
}

#[given("the generator has no credential")]
fn generator_has_no_credential(world: &mut JobAutomationWorld) {
    world.generator.push(Err(GenerationError::MissingCredential));
}

#[given("the automator has completed the job")]
fn automator_has_completed(world: &mut JobAutomationWorld) -> Result<(), eyre::Report> {
    let outcome = run_async(world.automator().on_page_load()).wrap_err("run automator")?;
    if !matches!(outcome, RunOutcome::Advanced { .. }) {
        return Err(eyre::eyre!("automator did not complete: {outcome:?}"));
    }
    Ok(())
}
