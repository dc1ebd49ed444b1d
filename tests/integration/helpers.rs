//! Shared helpers for the integration tests.

use std::time::Duration;

use sona_job_builder::config::AutomationConfig;
use sona_job_builder::page::adapters::memory::{ElementSpec, InMemoryPage};
use sona_job_builder::page::ports::Page;
use sona_job_builder::task::domain::JobFields;
use url::Url;

/// Phone number identifier used by every seeded task.
pub const PHONE_NUMBER_ID: &str = "PN1";

/// Workflow definition identifier used by every seeded task.
pub const WORKFLOW_ID: &str = "WD1";

/// Transcript prompt used by every seeded task.
pub const PROMPT: &str = "Caller wants a refund for order 1042.";

/// Phone number settings page the navigator starts on.
pub const SETTINGS_URL: &str = "https://my.quo.com/settings/phone-numbers";

/// Workflow builder page the automator runs on.
pub const BUILDER_URL: &str =
    "https://my.quo.com/settings/phone-numbers/PN1/workflow-builder?workflowDefinitionId=WD1";

/// Job fields returned by scripted generators.
#[must_use]
pub fn refund_job() -> JobFields {
    JobFields::new(
        "Refund Job",
        "Handles refund requests",
        "caller asks for a refund",
        "Confirm the order number.\nExplain the refund timeline.",
    )
    .expect("valid job fields")
}

/// Automation settings with short settle delays so real-time runs stay fast.
#[must_use]
pub fn fast_config() -> AutomationConfig {
    AutomationConfig {
        navigation_confirm_timeout_ms: 200,
        voice_agent_timeout_ms: 2_000,
        modal_timeout_ms: 2_000,
        poll_interval_ms: 10,
        short_settle_ms: 5,
        long_settle_ms: 5,
        ..AutomationConfig::default()
    }
}

/// Poll interval for tests that wait on background drivers.
pub const WAIT_STEP: Duration = Duration::from_millis(10);

fn page_at(url: &str) -> InMemoryPage {
    InMemoryPage::new(Url::parse(url).expect("valid url"))
}

/// Settings page offering the phone number "Manage" button.
#[must_use]
pub fn settings_page() -> InMemoryPage {
    let page = page_at(SETTINGS_URL);
    page.append_to_body(
        ElementSpec::new("button").attr("data-sentry-source-file", "PhoneNumberManageButton.tsx"),
    )
    .expect("manage button");
    page
}

/// Workflow builder page whose job dialog opens after "Create New Job".
#[must_use]
pub fn builder_page() -> InMemoryPage {
    let page = page_at(BUILDER_URL);
    let body = page.root().expect("body");
    page.append_to_body(ElementSpec::new("div").attr("data-block-type", "voiceAgent"))
        .expect("voice agent block");
    page.append_to_body(
        ElementSpec::new("button").attr("data-sentry-source-file", "SideNavigation.tsx"),
    )
    .expect("side navigation");
    page.append_to_body(
        ElementSpec::new("button").attr("data-sentry-source-file", "CustomJobsV1.tsx"),
    )
    .expect("add job button");
    let create = page
        .append_to_body(
            ElementSpec::new("button")
                .attr("data-sentry-source-file", "AddOrLinkCustomJobsV1Command.tsx"),
        )
        .expect("create job button");
    page.reveal_on_click(create, body, job_dialog())
        .expect("reveal dialog");
    page
}

fn job_dialog() -> ElementSpec {
    ElementSpec::new("div")
        .attr("role", "dialog")
        .child(ElementSpec::new("label").attr("for", "job-name").text("Job Name"))
        .child(ElementSpec::new("input").attr("id", "job-name"))
        .child(
            ElementSpec::new("label")
                .attr("for", "job-description")
                .text("Description"),
        )
        .child(ElementSpec::new("textarea").attr("id", "job-description"))
        .child(ElementSpec::new("label").attr("for", "job-trigger").text("Trigger"))
        .child(ElementSpec::new("textarea").attr("id", "job-trigger"))
        .child(
            ElementSpec::new("div")
                .attr("id", "job-instructions")
                .attr("contenteditable", "true"),
        )
}

/// Reads the value of the element with DOM id `dom_id`.
///
/// # Panics
///
/// Panics when the page cannot be read.
pub async fn value_of(page: &InMemoryPage, dom_id: &str) -> Option<String> {
    let snapshot = page.snapshot().await.expect("snapshot");
    let node = snapshot.find_by_dom_id(dom_id)?.id();
    page.value(node).expect("page readable")
}
