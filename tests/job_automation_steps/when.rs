//! When steps for job automation BDD scenarios.

use super::world::{JobAutomationWorld, run_async};
use rstest_bdd_macros::when;

#[when("the navigator runs")]
fn navigator_runs(world: &mut JobAutomationWorld) {
    let outcome = run_async(world.navigator().on_page_load());
    world.last_outcome = Some(outcome);
}

#[when("the automator runs")]
fn automator_runs(world: &mut JobAutomationWorld) {
    let outcome = run_async(world.automator().on_page_load());
    world.last_outcome = Some(outcome);
}

#[when("the automator runs again")]
fn automator_runs_again(world: &mut JobAutomationWorld) {
    let outcome = run_async(world.automator().activate());
    world.last_outcome = Some(outcome);
}
