//! Selectors and locator chains for the phone number settings page and the
//! workflow builder.

use crate::page::domain::{LabelMatcher, Selector};
use crate::page::services::{HINT_ATTRIBUTES, LocatorChain, Strategy};

const PHONE_NUMBER_SETTINGS: &str = "/settings/phone-numbers/";

fn sentry_button(source_file: &str) -> Selector {
    Selector::tag("button").attr_eq("data-sentry-source-file", source_file)
}

/// Link that opens a phone number's workflow builder.
#[must_use]
pub fn workflow_builder_link() -> Selector {
    Selector::tag("a")
        .attr_contains("href", PHONE_NUMBER_SETTINGS)
        .attr_contains("href", "workflow-builder")
}

/// Ways to reach the workflow builder from the phone number settings,
/// most specific first.
#[must_use]
pub fn manage_affordances() -> LocatorChain {
    LocatorChain::new()
        .then("workflow-builder-link", Strategy::Selector(workflow_builder_link()))
        .then(
            "manage-button",
            Strategy::Selector(sentry_button("PhoneNumberManageButton.tsx")),
        )
        .then(
            "phone-number-link-button",
            Strategy::Selector(
                Selector::tag("a")
                    .attr_contains("href", PHONE_NUMBER_SETTINGS)
                    .descendant(Selector::tag("button")),
            ),
        )
        .then(
            "manage-text",
            Strategy::Text {
                elements: Selector::tag("button"),
                text: LabelMatcher::new(["manage"]),
            },
        )
}

/// The voice agent block on the builder canvas.
#[must_use]
pub fn voice_agent_block() -> Selector {
    Selector::any().attr_eq("data-block-type", "voiceAgent")
}

/// Side navigation button; opens the job list and confirms a new job.
#[must_use]
pub fn side_navigation_button() -> Selector {
    sentry_button("SideNavigation.tsx")
}

/// "Add Job" button in the custom jobs panel.
#[must_use]
pub fn add_job_button() -> Selector {
    sentry_button("CustomJobsV1.tsx")
}

/// "Create New Job" command in the add-or-link menu.
#[must_use]
pub fn create_job_button() -> Selector {
    sentry_button("AddOrLinkCustomJobsV1Command.tsx")
}

/// The job modal.
#[must_use]
pub fn job_dialog() -> Selector {
    Selector::any().attr_eq("role", "dialog")
}

fn text_controls() -> Selector {
    Selector::tag("input").or(Selector::tag("textarea"))
}

fn labelled_field(
    labels: &'static [&'static str],
    fallbacks: [(&'static str, Selector); 2],
) -> LocatorChain {
    let [first, second] = fallbacks;
    LocatorChain::new()
        .then(
            "label",
            Strategy::LabelledControl {
                labels: LabelMatcher::new(labels),
                controls: text_controls(),
            },
        )
        .then(
            "attribute-hint",
            Strategy::AttributeHint {
                hints: LabelMatcher::new(labels),
                attributes: HINT_ATTRIBUTES,
                controls: text_controls(),
            },
        )
        .then(first.0, Strategy::Selector(first.1))
        .then(second.0, Strategy::Selector(second.1))
}

/// Locator chains for the fields of the job modal.
///
/// Every chain is evaluated inside the dialog element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFormLocators {
    /// Job name input. Required.
    pub name: LocatorChain,
    /// Description textarea. Optional.
    pub description: LocatorChain,
    /// Trigger textarea. Required.
    pub trigger: LocatorChain,
    /// Instructions editor. Required.
    pub instructions: LocatorChain,
}

impl Default for JobFormLocators {
    fn default() -> Self {
        Self {
            name: labelled_field(
                &["Job Name", "Name"],
                [
                    ("name-attribute", Selector::tag("input").attr_eq("name", "name")),
                    (
                        "aria-label",
                        Selector::tag("input").attr_contains("aria-label", "Job Name"),
                    ),
                ],
            ),
            description: labelled_field(
                &["Description"],
                [
                    (
                        "name-attribute",
                        Selector::tag("textarea").attr_eq("name", "description"),
                    ),
                    (
                        "aria-label",
                        Selector::tag("textarea").attr_contains("aria-label", "Description"),
                    ),
                ],
            ),
            trigger: labelled_field(
                &["Trigger"],
                [
                    (
                        "name-attribute",
                        Selector::tag("textarea").attr_eq("name", "trigger"),
                    ),
                    (
                        "aria-label",
                        Selector::tag("textarea").attr_contains("aria-label", "Trigger"),
                    ),
                ],
            ),
            instructions: instructions_chain(),
        }
    }
}

fn instructions_chain() -> LocatorChain {
    let editable = Selector::any().attr_eq("contenteditable", "true");
    LocatorChain::new()
        .then(
            "rich-text-editor",
            Strategy::Selector(editable.clone().attr_eq("role", "textbox")),
        )
        .then(
            "instruction-textarea",
            Strategy::AttributeHint {
                hints: LabelMatcher::new(["instruction"]),
                attributes: &["aria-label", "name"],
                controls: Selector::tag("textarea"),
            },
        )
        .then("first-editable", Strategy::Selector(editable))
        .then("first-textarea", Strategy::Selector(Selector::tag("textarea")))
}
