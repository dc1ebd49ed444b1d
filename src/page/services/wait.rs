//! Waiting and value-setting primitives over the [`Page`] port.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::debug;

use crate::page::{
    domain::{NodeId, Selector},
    ports::{Page, PageError, PageResult},
};

/// Errors returned by wait utilities.
#[derive(Debug, Clone, Error)]
pub enum WaitError {
    /// The expected page state never materialised.
    #[error("timed out after {waited:?} waiting for {target}")]
    Timeout {
        /// What was being waited for.
        target: String,
        /// The configured timeout.
        waited: Duration,
    },

    /// The page failed while being inspected.
    #[error(transparent)]
    Page(#[from] PageError),
}

/// Waits until `selector` matches inside `scope` (or the document).
///
/// Resolves at once when already matched; otherwise re-checks after every
/// mutation notification. When the mutation feed closes the wait runs out
/// the deadline without further checks.
///
/// # Errors
///
/// Returns [`WaitError::Timeout`] after `timeout`, or [`WaitError::Page`]
/// when a snapshot fails.
pub async fn wait_for_selector<P>(
    page: &P,
    scope: Option<NodeId>,
    selector: &Selector,
    timeout: Duration,
) -> Result<NodeId, WaitError>
where
    P: Page + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut mutations = page.subscribe_mutations();
    loop {
        let snapshot = page.snapshot().await?;
        if let Some(element) = snapshot.query(scope, selector) {
            debug!(%selector, node = %element.id(), "selector matched");
            return Ok(element.id());
        }
        match tokio::time::timeout_at(deadline, mutations.recv()).await {
            Ok(Ok(_) | Err(RecvError::Lagged(_))) => {}
            Ok(Err(RecvError::Closed)) => {
                tokio::time::sleep_until(deadline).await;
                return Err(selector_timeout(selector, timeout));
            }
            Err(_) => return Err(selector_timeout(selector, timeout)),
        }
    }
}

fn selector_timeout(selector: &Selector, timeout: Duration) -> WaitError {
    WaitError::Timeout {
        target: format!("selector {selector}"),
        waited: timeout,
    }
}

/// Evaluates `predicate` now and then every `interval` until it yields a
/// value.
///
/// # Errors
///
/// Returns the predicate's error immediately, or [`WaitError::Timeout`]
/// once `timeout` has elapsed without a value.
pub async fn wait_for_condition<T, F, Fut>(
    target: &str,
    mut predicate: F,
    interval: Duration,
    timeout: Duration,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PageResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = predicate().await? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                target: target.to_owned(),
                waited: timeout,
            });
        }
        tokio::time::sleep_until((now + interval).min(deadline)).await;
    }
}

/// Sets a framework-controlled input's value so bound listeners observe it.
///
/// # Errors
///
/// Propagates [`PageError`] from the adapter.
pub async fn set_controlled_input_value<P>(page: &P, node: NodeId, value: &str) -> PageResult<()>
where
    P: Page + ?Sized,
{
    debug!(%node, chars = value.chars().count(), "setting control value");
    page.set_control_value(node, value).await
}

/// Replaces a content-editable region's text and reselects it.
///
/// # Errors
///
/// Propagates [`PageError`] from the adapter.
pub async fn set_editable_region_value<P>(page: &P, node: NodeId, text: &str) -> PageResult<()>
where
    P: Page + ?Sized,
{
    debug!(%node, chars = text.chars().count(), "setting editable region text");
    page.set_editable_text(node, text).await
}

/// Dispatches a synthetic click.
///
/// # Errors
///
/// Propagates [`PageError`] from the adapter.
pub async fn click_element<P>(page: &P, node: NodeId) -> PageResult<()>
where
    P: Page + ?Sized,
{
    debug!(%node, "clicking element");
    page.click(node).await
}
