//! Page port abstraction.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use url::Url;

use crate::page::domain::{DomSnapshot, NodeId};

/// Result type for page operations.
pub type PageResult<T> = Result<T, PageError>;

/// Signal that the page's element structure changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomMutation;

/// A live page the drivers can inspect and manipulate.
///
/// Node ids handed out by [`Page::snapshot`] stay valid for as long as the
/// element stays attached.
#[async_trait]
pub trait Page: Send + Sync {
    /// Captures the current element tree.
    async fn snapshot(&self) -> PageResult<DomSnapshot>;

    /// Returns the current location.
    async fn current_url(&self) -> PageResult<Url>;

    /// Dispatches a bubbling synthetic click on `node`.
    async fn click(&self, node: NodeId) -> PageResult<()>;

    /// Sets a form control's value through the native value setter and
    /// dispatches bubbling `input` and `change` events.
    async fn set_control_value(&self, node: NodeId, value: &str) -> PageResult<()>;

    /// Focuses `node`, replaces its content with a single text node, selects
    /// that content, and dispatches `input` and `change`.
    async fn set_editable_text(&self, node: NodeId, text: &str) -> PageResult<()>;

    /// Navigates the page to `url`.
    async fn navigate(&self, url: &Url) -> PageResult<()>;

    /// Subscribes to structural change notifications.
    fn subscribe_mutations(&self) -> broadcast::Receiver<DomMutation>;
}

/// Errors returned by page adapters.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// The node is no longer attached to the document.
    #[error("{0} is no longer attached")]
    Detached(NodeId),

    /// The element cannot hold the requested value.
    #[error("{node} (<{tag}>) is not editable")]
    NotEditable {
        /// Target node.
        node: NodeId,
        /// Tag of the target node.
        tag: String,
    },

    /// Navigation was refused or failed.
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// Requested location.
        url: String,
        /// Backend message.
        message: String,
    },

    /// The page backend failed.
    #[error("page backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl PageError {
    /// Wraps a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
