//! Immutable element tree captured from a page.
//!
//! Adapters serialise the live document to HTML, tagging every element
//! they can address with [`NODE_ID_ATTRIBUTE`]. The markup is parsed with
//! [`scraper`]; tagged elements form the snapshot and selector queries run
//! against the parsed document.

use super::Selector;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Attribute carrying an element's [`NodeId`] in snapshot markup.
pub const NODE_ID_ATTRIBUTE: &str = "data-jb-node";

/// Stable identifier of an element within one page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    id: NodeId,
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    subtree_end: usize,
}

/// Flattened, read-only view of a page's elements.
///
/// Nodes are stored in document order, so index order equals pre-order
/// traversal order. Elements without a node id (parser-inserted `<head>`,
/// `<tbody>` and the like) are skipped; their tagged descendants attach to
/// the nearest tagged ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSnapshot {
    markup: String,
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl DomSnapshot {
    /// Parses tagged markup into a snapshot.
    #[must_use]
    pub fn from_html(markup: impl Into<String>) -> Self {
        let mut snapshot = Self {
            markup: markup.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        let document = Html::parse_document(&snapshot.markup);
        snapshot.collect(document.root_element(), None);
        snapshot
    }

    fn collect(&mut self, element: ElementRef<'_>, parent: Option<usize>) {
        let position = tagged_id(element)
            .filter(|id| !self.index.contains_key(id))
            .map(|id| self.push(id, element, parent));
        let enclosing = position.or(parent);
        for child in element.children().filter_map(ElementRef::wrap) {
            self.collect(child, enclosing);
        }
        let end = self.nodes.len();
        if let Some(node) = position.and_then(|at| self.nodes.get_mut(at)) {
            node.subtree_end = end;
        }
    }

    fn push(&mut self, id: NodeId, element: ElementRef<'_>, parent: Option<usize>) -> usize {
        let position = self.nodes.len();
        let value = element.value();
        self.nodes.push(Node {
            id,
            tag: value.name().to_ascii_lowercase(),
            attributes: value
                .attrs()
                .filter(|(name, _)| *name != NODE_ID_ATTRIBUTE)
                .map(|(name, attr)| (name.to_owned(), attr.to_owned()))
                .collect(),
            text: element.text().collect(),
            parent,
            children: Vec::new(),
            subtree_end: position + 1,
        });
        self.index.insert(id, position);
        if let Some(parent_node) = parent.and_then(|at| self.nodes.get_mut(at)) {
            parent_node.children.push(position);
        }
        position
    }

    /// Returns the serialised markup the snapshot was built from.
    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Returns the outermost tagged element.
    #[must_use]
    pub const fn root(&self) -> ElementView<'_> {
        ElementView {
            snapshot: self,
            position: 0,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the snapshot holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks an element up by node id.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<ElementView<'_>> {
        self.index.get(&id).map(|position| ElementView {
            snapshot: self,
            position: *position,
        })
    }

    /// Returns the first element whose `id` attribute equals `dom_id`.
    #[must_use]
    pub fn find_by_dom_id(&self, dom_id: &str) -> Option<ElementView<'_>> {
        self.elements().find(|element| element.attr("id") == Some(dom_id))
    }

    /// Iterates every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementView<'_>> {
        (0..self.nodes.len()).map(|position| ElementView {
            snapshot: self,
            position,
        })
    }

    /// Returns the first element matching `selector`.
    ///
    /// With `scope` set, only descendants of that element are considered;
    /// otherwise the whole document, including the root, is searched.
    #[must_use]
    pub fn query(&self, scope: Option<NodeId>, selector: &Selector) -> Option<ElementView<'_>> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Returns every element matching `selector`, in document order.
    #[must_use]
    pub fn query_all(&self, scope: Option<NodeId>, selector: &Selector) -> Vec<ElementView<'_>> {
        let bounds = match scope {
            None => 0..self.nodes.len(),
            Some(id) => match self.element(id) {
                Some(element) => element.position + 1..element.subtree_end(),
                None => return Vec::new(),
            },
        };
        self.matching_positions(selector)
            .into_iter()
            .filter(|position| bounds.contains(position))
            .map(|position| ElementView {
                snapshot: self,
                position,
            })
            .collect()
    }

    fn matching_positions(&self, selector: &Selector) -> Vec<usize> {
        let Some(compiled) = selector.compile() else {
            return Vec::new();
        };
        let document = Html::parse_document(&self.markup);
        document
            .select(&compiled)
            .filter_map(tagged_id)
            .filter_map(|id| self.index.get(&id).copied())
            .collect()
    }

    fn node(&self, position: usize) -> Option<&Node> {
        self.nodes.get(position)
    }
}

fn tagged_id(element: ElementRef<'_>) -> Option<NodeId> {
    element
        .value()
        .attr(NODE_ID_ATTRIBUTE)
        .and_then(|raw| raw.trim().parse().ok())
        .map(NodeId)
}

/// Borrowed handle onto one element of a [`DomSnapshot`].
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    snapshot: &'a DomSnapshot,
    position: usize,
}

impl<'a> ElementView<'a> {
    fn node(&self) -> Option<&'a Node> {
        self.snapshot.node(self.position)
    }

    const fn at(&self, position: usize) -> Self {
        Self {
            snapshot: self.snapshot,
            position,
        }
    }

    /// Returns the element's node id.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node().map_or(NodeId(u64::MAX), |node| node.id)
    }

    /// Returns the lowercase tag name.
    #[must_use]
    pub fn tag(&self) -> &'a str {
        self.node().map_or("", |node| node.tag.as_str())
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node()
            .and_then(|node| node.attributes.get(name))
            .map(String::as_str)
    }

    /// Returns the whitespace-separated class list.
    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Returns the element's text content in document order.
    #[must_use]
    pub fn text_content(&self) -> &'a str {
        self.node().map_or("", |node| node.text.as_str())
    }

    /// Returns the parent element.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.node()
            .and_then(|node| node.parent)
            .map(|position| self.at(position))
    }

    /// Iterates direct children in document order.
    pub fn children(&self) -> impl Iterator<Item = ElementView<'a>> + 'a {
        let view = *self;
        self.node()
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |position| view.at(*position))
    }

    /// Iterates all descendants in document order, excluding `self`.
    pub fn descendants(&self) -> impl Iterator<Item = ElementView<'a>> + 'a {
        let view = *self;
        (self.position + 1..self.subtree_end()).map(move |position| view.at(position))
    }

    /// Returns the next sibling element.
    #[must_use]
    pub fn next_element_sibling(&self) -> Option<Self> {
        let parent = self.parent()?;
        let siblings = parent.node()?.children.as_slice();
        let offset = siblings.iter().position(|position| *position == self.position)?;
        siblings.get(offset + 1).map(|position| self.at(*position))
    }

    /// Returns `true` when `self` contains `other` (or is `other`).
    #[must_use]
    pub fn contains(&self, other: &ElementView<'_>) -> bool {
        (self.position..self.subtree_end()).contains(&other.position)
    }

    /// Returns `true` when `selector` matches this element.
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        self.snapshot
            .matching_positions(selector)
            .contains(&self.position)
    }

    fn subtree_end(&self) -> usize {
        self.node().map_or(self.position, |node| node.subtree_end)
    }
}
