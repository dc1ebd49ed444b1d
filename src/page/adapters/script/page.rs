//! [`Page`] adapter for any host that can evaluate JavaScript in a browser
//! tab (a DevTools protocol session, a WebDriver client, an embedded
//! webview).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use crate::page::{
    domain::{DomSnapshot, NODE_ID_ATTRIBUTE, NodeId},
    ports::{DomMutation, Page, PageError, PageResult},
};

/// Browser connection able to run scripts and forward mutation signals.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Evaluates `script` as an expression and returns its JSON value.
    async fn evaluate(&self, script: &str) -> PageResult<Value>;

    /// Subscribes to signals raised by the injected mutation observer.
    fn subscribe_mutations(&self) -> broadcast::Receiver<DomMutation>;
}

/// Installs the node registry once per document. Element ids are assigned
/// on first sight and stay stable while the element lives.
const REGISTRY: &str = r"(() => {
  const registry = window.__jobBuilderNodes || (window.__jobBuilderNodes = {
    ids: new WeakMap(),
    elements: new Map(),
    next: 1,
  });
  registry.idOf = registry.idOf || ((el) => {
    let id = registry.ids.get(el);
    if (id === undefined) {
      id = registry.next++;
      registry.ids.set(el, id);
      registry.elements.set(id, new WeakRef(el));
    }
    return id;
  });
  registry.lookup = registry.lookup || ((id) => {
    const el = registry.elements.get(id)?.deref();
    return el && el.isConnected ? el : null;
  });
  return registry;
})()";

/// Serialises a copy of the document with every element tagged by its
/// registry id. The live DOM is left untouched.
const SNAPSHOT: &str = r"(() => {
  const registry = __REGISTRY__;
  const root = document.documentElement;
  const copy = root.cloneNode(true);
  const tag = (original, clone) => {
    clone.setAttribute('__NODE_ATTRIBUTE__', String(registry.idOf(original)));
    const originals = original.children;
    const clones = clone.children;
    for (let i = 0; i < originals.length && i < clones.length; i++) {
      tag(originals[i], clones[i]);
    }
  };
  tag(root, copy);
  return copy.outerHTML;
})()";

const CLICK: &str = r"(() => {
  const el = (__REGISTRY__).lookup(__NODE__);
  if (!el) return { status: 'detached' };
  el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
  return { status: 'ok' };
})()";

const SET_CONTROL_VALUE: &str = r"(() => {
  const el = (__REGISTRY__).lookup(__NODE__);
  if (!el) return { status: 'detached' };
  if (!('value' in el)) return { status: 'notEditable', tag: el.tagName.toLowerCase() };
  const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value')?.set;
  if (setter) setter.call(el, __VALUE__); else el.value = __VALUE__;
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { status: 'ok' };
})()";

const SET_EDITABLE_TEXT: &str = r"(() => {
  const el = (__REGISTRY__).lookup(__NODE__);
  if (!el) return { status: 'detached' };
  if (!el.isContentEditable) return { status: 'notEditable', tag: el.tagName.toLowerCase() };
  el.focus();
  el.replaceChildren(document.createTextNode(__VALUE__));
  const range = document.createRange();
  range.selectNodeContents(el);
  const selection = window.getSelection();
  selection.removeAllRanges();
  selection.addRange(range);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { status: 'ok' };
})()";

const NAVIGATE: &str = r"(() => {
  window.location.assign(__VALUE__);
  return { status: 'ok' };
})()";

const CURRENT_URL: &str = "window.location.href";

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ScriptStatus {
    Ok,
    Detached,
    NotEditable { tag: String },
}

/// [`Page`] implementation that drives a real document through scripts.
#[derive(Debug, Clone)]
pub struct ScriptedPage<H: ScriptHost> {
    host: H,
}

impl<H: ScriptHost> ScriptedPage<H> {
    /// Wraps a script host.
    #[must_use]
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    /// Returns the underlying host.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    async fn run(&self, template: &str, node: Option<NodeId>, value: Option<&str>) -> PageResult<ScriptStatus> {
        let script = render(template, node, value)?;
        let raw = self.host.evaluate(&script).await?;
        serde_json::from_value(raw).map_err(PageError::backend)
    }

    async fn run_on(&self, template: &str, node: NodeId, value: Option<&str>) -> PageResult<()> {
        match self.run(template, Some(node), value).await? {
            ScriptStatus::Ok => Ok(()),
            ScriptStatus::Detached => Err(PageError::Detached(node)),
            ScriptStatus::NotEditable { tag } => Err(PageError::NotEditable { node, tag }),
        }
    }
}

fn render(template: &str, node: Option<NodeId>, value: Option<&str>) -> PageResult<String> {
    let mut script = template
        .replace("__REGISTRY__", REGISTRY)
        .replace("__NODE_ATTRIBUTE__", NODE_ID_ATTRIBUTE);
    if let Some(node) = node {
        script = script.replace("__NODE__", &node.value().to_string());
    }
    if let Some(value) = value {
        let encoded = serde_json::to_string(value).map_err(PageError::backend)?;
        script = script.replace("__VALUE__", &encoded);
    }
    Ok(script)
}

#[async_trait]
impl<H: ScriptHost> Page for ScriptedPage<H> {
    async fn snapshot(&self) -> PageResult<DomSnapshot> {
        let script = render(SNAPSHOT, None, None)?;
        let raw = self.host.evaluate(&script).await?;
        let markup: String = serde_json::from_value(raw).map_err(PageError::backend)?;
        Ok(DomSnapshot::from_html(markup))
    }

    async fn current_url(&self) -> PageResult<Url> {
        let raw = self.host.evaluate(CURRENT_URL).await?;
        let href = raw.as_str().unwrap_or_default();
        Url::parse(href).map_err(PageError::backend)
    }

    async fn click(&self, node: NodeId) -> PageResult<()> {
        self.run_on(CLICK, node, None).await
    }

    async fn set_control_value(&self, node: NodeId, value: &str) -> PageResult<()> {
        self.run_on(SET_CONTROL_VALUE, node, Some(value)).await
    }

    async fn set_editable_text(&self, node: NodeId, text: &str) -> PageResult<()> {
        self.run_on(SET_EDITABLE_TEXT, node, Some(text)).await
    }

    async fn navigate(&self, url: &Url) -> PageResult<()> {
        debug!(%url, "navigating");
        match self.run(NAVIGATE, None, Some(url.as_str())).await {
            Ok(ScriptStatus::Ok) => Ok(()),
            Ok(other) => Err(PageError::Navigation {
                url: url.to_string(),
                message: format!("unexpected script status {other:?}"),
            }),
            Err(err) => Err(PageError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            }),
        }
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<DomMutation> {
        self.host.subscribe_mutations()
    }
}
