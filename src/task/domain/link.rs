//! Deep link into the workflow builder page.

use super::{PhoneNumberId, TaskDomainError, WorkflowDefinitionId};
use url::{Url, form_urlencoded};

/// Builds `{base}/settings/phone-numbers/{phone}/workflow-builder?workflowDefinitionId={id}`.
///
/// Path segments are encoded by [`Url`]; the query value is
/// percent-encoded with `%20` for spaces, as `encodeURIComponent` does.
///
/// # Errors
///
/// Returns [`TaskDomainError::InvalidLinkBase`] when `base` cannot carry a
/// path (for example a `mailto:` URL).
pub fn workflow_builder_link(
    base: &Url,
    phone_number_id: &PhoneNumberId,
    workflow_definition_id: &WorkflowDefinitionId,
) -> Result<Url, TaskDomainError> {
    let mut link = base.clone();
    link.set_query(None);
    link.set_fragment(None);
    link.path_segments_mut()
        .map_err(|()| TaskDomainError::InvalidLinkBase(base.to_string()))?
        .clear()
        .extend([
            "settings",
            "phone-numbers",
            phone_number_id.as_str(),
            "workflow-builder",
        ]);
    let encoded: String = form_urlencoded::byte_serialize(workflow_definition_id.as_str().as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    link.set_query(Some(&format!("workflowDefinitionId={encoded}")));
    Ok(link)
}

/// Returns `true` when `url` points at a workflow builder page.
#[must_use]
pub fn is_workflow_builder_url(url: &Url) -> bool {
    url.as_str().to_lowercase().contains("workflow-builder")
}
