//! In-memory page with a mutable arena DOM and an event log.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use crate::page::{
    domain::{DomSnapshot, NODE_ID_ATTRIBUTE, NodeId},
    ports::{DomMutation, Page, PageError, PageResult},
};

const MUTATION_CAPACITY: usize = 256;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn push_escaped(out: &mut String, raw: &str, attribute: bool) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

/// Builder for elements inserted into an [`InMemoryPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Starts an element with `tag`.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }

    /// Sets the element's own text.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_owned();
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// Something the page observed a driver do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Synthetic click.
    Click(NodeId),
    /// Element focused.
    Focus(NodeId),
    /// `input` event dispatched.
    Input(NodeId),
    /// `change` event dispatched.
    Change(NodeId),
    /// Selection placed over the element's content.
    SelectionSet(NodeId),
    /// Location changed.
    Navigate(Url),
}

#[derive(Debug, Clone)]
struct DomNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct PageState {
    nodes: HashMap<NodeId, DomNode>,
    root: NodeId,
    next_id: u64,
    url: Url,
    events: Vec<PageEvent>,
    reveals: HashMap<NodeId, Vec<(NodeId, ElementSpec)>>,
    navigation_blocked: Option<String>,
}

impl PageState {
    fn insert(&mut self, parent: Option<NodeId>, spec: ElementSpec) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            DomNode {
                tag: spec.tag,
                attributes: spec.attributes,
                text: spec.text,
                value: None,
                parent,
                children: Vec::new(),
            },
        );
        if let Some(parent_node) = parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            parent_node.children.push(id);
        }
        for child in spec.children {
            self.insert(Some(id), child);
        }
        id
    }

    fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            parent.children.retain(|child| *child != id);
        }
        for child in node.children {
            self.detach(child);
        }
    }

    fn node(&self, id: NodeId) -> PageResult<&DomNode> {
        self.nodes.get(&id).ok_or(PageError::Detached(id))
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        out.push(' ');
        out.push_str(NODE_ID_ATTRIBUTE);
        out.push_str("=\"");
        out.push_str(&id.value().to_string());
        out.push('"');
        for (name, value) in &node.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            push_escaped(out, value, true);
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&node.tag.as_str()) {
            return;
        }
        push_escaped(out, &node.text, false);
        for child in &node.children {
            self.write_html(*child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.nodes.get(&id) else {
            return String::new();
        };
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }
}

/// Deterministic in-process [`Page`] implementation.
///
/// Clicking an `<a href>` follows the link; clicking an element registered
/// with [`InMemoryPage::reveal_on_click`] inserts the prepared content.
/// Every structural change is broadcast to mutation subscribers.
#[derive(Debug, Clone)]
pub struct InMemoryPage {
    state: Arc<Mutex<PageState>>,
    mutations: broadcast::Sender<DomMutation>,
}

impl InMemoryPage {
    /// Creates an empty page (a lone `<body>`) at `url`.
    #[must_use]
    pub fn new(url: Url) -> Self {
        let mut state = PageState {
            nodes: HashMap::new(),
            root: NodeId::new(0),
            next_id: 0,
            url,
            events: Vec::new(),
            reveals: HashMap::new(),
            navigation_blocked: None,
        };
        state.root = state.insert(None, ElementSpec::new("body"));
        let (mutations, _) = broadcast::channel(MUTATION_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(state)),
            mutations,
        }
    }

    fn lock(&self) -> PageResult<MutexGuard<'_, PageState>> {
        self.state
            .lock()
            .map_err(|err| PageError::backend(std::io::Error::other(err.to_string())))
    }

    fn notify(&self) {
        if self.mutations.send(DomMutation).is_err() {
            debug!("no mutation subscribers");
        }
    }

    /// Returns the `<body>` node.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn root(&self) -> PageResult<NodeId> {
        Ok(self.lock()?.root)
    }

    /// Appends `spec` under `parent` and returns the new element's id.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Detached`] when `parent` is not attached.
    pub fn append(&self, parent: NodeId, spec: ElementSpec) -> PageResult<NodeId> {
        let id = {
            let mut state = self.lock()?;
            state.node(parent)?;
            state.insert(Some(parent), spec)
        };
        self.notify();
        Ok(id)
    }

    /// Appends `spec` under the `<body>`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn append_to_body(&self, spec: ElementSpec) -> PageResult<NodeId> {
        let root = self.root()?;
        self.append(root, spec)
    }

    /// Removes `node` and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn remove(&self, node: NodeId) -> PageResult<()> {
        self.lock()?.detach(node);
        self.notify();
        Ok(())
    }

    /// Inserts `spec` under `parent` the first time `trigger` is clicked.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn reveal_on_click(
        &self,
        trigger: NodeId,
        parent: NodeId,
        spec: ElementSpec,
    ) -> PageResult<()> {
        self.lock()?
            .reveals
            .entry(trigger)
            .or_default()
            .push((parent, spec));
        Ok(())
    }

    /// Makes every subsequent navigation fail with `message`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn block_navigation(&self, message: &str) -> PageResult<()> {
        self.lock()?.navigation_blocked = Some(message.to_owned());
        Ok(())
    }

    /// Replaces the current location without recording an event.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn set_url(&self, url: Url) -> PageResult<()> {
        self.lock()?.url = url;
        Ok(())
    }

    /// Returns the recorded events.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Backend`] when the page state is poisoned.
    pub fn events(&self) -> PageResult<Vec<PageEvent>> {
        Ok(self.lock()?.events.clone())
    }

    /// Returns the value set on a control, or the text of an editable
    /// region.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Detached`] when `node` is not attached.
    pub fn value(&self, node: NodeId) -> PageResult<Option<String>> {
        let state = self.lock()?;
        let element = state.node(node)?;
        if element.value.is_some() {
            return Ok(element.value.clone());
        }
        if is_content_editable(element) {
            return Ok(Some(state.text_content(node)));
        }
        Ok(None)
    }
}

fn is_control(node: &DomNode) -> bool {
    matches!(node.tag.as_str(), "input" | "textarea" | "select")
}

fn is_content_editable(node: &DomNode) -> bool {
    node.attributes
        .get("contenteditable")
        .is_some_and(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
}

#[async_trait]
impl Page for InMemoryPage {
    async fn snapshot(&self) -> PageResult<DomSnapshot> {
        let state = self.lock()?;
        if !state.nodes.contains_key(&state.root) {
            return Err(PageError::Detached(state.root));
        }
        let mut markup = String::new();
        state.write_html(state.root, &mut markup);
        Ok(DomSnapshot::from_html(markup))
    }

    async fn current_url(&self) -> PageResult<Url> {
        Ok(self.lock()?.url.clone())
    }

    async fn click(&self, node: NodeId) -> PageResult<()> {
        let mutated = {
            let mut state = self.lock()?;
            let element = state.node(node)?;
            let link = (element.tag == "a")
                .then(|| element.attributes.get("href").cloned())
                .flatten();
            state.events.push(PageEvent::Click(node));
            if let Some(href) = link {
                let target = state.url.join(&href).map_err(|err| PageError::Navigation {
                    url: href.clone(),
                    message: err.to_string(),
                })?;
                debug!(%target, "following link");
                state.url = target.clone();
                state.events.push(PageEvent::Navigate(target));
            }
            let reveals = state.reveals.remove(&node).unwrap_or_default();
            let mutated = !reveals.is_empty();
            for (parent, spec) in reveals {
                if state.nodes.contains_key(&parent) {
                    state.insert(Some(parent), spec);
                }
            }
            mutated
        };
        if mutated {
            self.notify();
        }
        Ok(())
    }

    async fn set_control_value(&self, node: NodeId, value: &str) -> PageResult<()> {
        let mut state = self.lock()?;
        let element = state
            .nodes
            .get_mut(&node)
            .ok_or(PageError::Detached(node))?;
        if !is_control(element) {
            return Err(PageError::NotEditable {
                node,
                tag: element.tag.clone(),
            });
        }
        element.value = Some(value.to_owned());
        state.events.push(PageEvent::Input(node));
        state.events.push(PageEvent::Change(node));
        Ok(())
    }

    async fn set_editable_text(&self, node: NodeId, text: &str) -> PageResult<()> {
        {
            let mut state = self.lock()?;
            let element = state.node(node)?;
            if !is_content_editable(element) {
                return Err(PageError::NotEditable {
                    node,
                    tag: element.tag.clone(),
                });
            }
            let children = element.children.clone();
            for child in children {
                state.detach(child);
            }
            if let Some(element) = state.nodes.get_mut(&node) {
                element.text = text.to_owned();
            }
            state.events.extend([
                PageEvent::Focus(node),
                PageEvent::SelectionSet(node),
                PageEvent::Input(node),
                PageEvent::Change(node),
            ]);
        }
        self.notify();
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> PageResult<()> {
        let mut state = self.lock()?;
        if let Some(message) = state.navigation_blocked.clone() {
            return Err(PageError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        state.url = url.clone();
        state.events.push(PageEvent::Navigate(url.clone()));
        Ok(())
    }

    fn subscribe_mutations(&self) -> broadcast::Receiver<DomMutation> {
        self.mutations.subscribe()
    }
}
