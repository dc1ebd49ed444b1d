//! Ordered element discovery over unstable third-party markup.
//!
//! A [`LocatorChain`] tries named strategies in order against one snapshot;
//! the first hit wins. Strategies never touch the page, so each can be
//! exercised against hand-built markup.

use crate::page::domain::{DomSnapshot, ElementView, LabelMatcher, NodeId, Selector};

/// A single pure lookup rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// First element matching the selector.
    Selector(Selector),

    /// Control associated with a `<label>` whose text matches.
    ///
    /// For each matching label in document order: the element named by its
    /// `for` attribute, else the first nested control, else the next sibling
    /// when it is a control.
    LabelledControl {
        /// Accepted label texts.
        labels: LabelMatcher,
        /// What counts as a control.
        controls: Selector,
    },

    /// First control where one of `attributes` contains a candidate after
    /// normalisation.
    AttributeHint {
        /// Accepted attribute fragments.
        hints: LabelMatcher,
        /// Attributes inspected, usually [`HINT_ATTRIBUTES`].
        attributes: &'static [&'static str],
        /// What counts as a control.
        controls: Selector,
    },

    /// First element matching `elements` whose text content matches.
    Text {
        /// Elements to consider.
        elements: Selector,
        /// Accepted texts.
        text: LabelMatcher,
    },
}

/// Attributes that commonly describe an unlabelled form control.
pub const HINT_ATTRIBUTES: &[&str] = &["name", "placeholder", "aria-label"];

impl Strategy {
    /// Applies the strategy to `snapshot` within `scope`.
    #[must_use]
    pub fn locate(&self, snapshot: &DomSnapshot, scope: Option<NodeId>) -> Option<NodeId> {
        match self {
            Self::Selector(selector) => snapshot.query(scope, selector).map(|el| el.id()),
            Self::LabelledControl { labels, controls } => {
                locate_labelled(snapshot, scope, labels, controls)
            }
            Self::AttributeHint {
                hints,
                attributes,
                controls,
            } => snapshot
                .query_all(scope, controls)
                .into_iter()
                .find(|control| {
                    attributes.iter().any(|name| {
                        control
                            .attr(name)
                            .is_some_and(|value| hints.matches(value))
                    })
                })
                .map(|el| el.id()),
            Self::Text { elements, text } => snapshot
                .query_all(scope, elements)
                .into_iter()
                .find(|element| text.matches(element.text_content()))
                .map(|el| el.id()),
        }
    }
}

fn locate_labelled(
    snapshot: &DomSnapshot,
    scope: Option<NodeId>,
    labels: &LabelMatcher,
    controls: &Selector,
) -> Option<NodeId> {
    let scope_element = scope.and_then(|id| snapshot.element(id));
    let in_scope = |element: &ElementView<'_>| {
        scope_element.is_none_or(|root| root.id() != element.id() && root.contains(element))
    };
    let label_selector = Selector::tag("label");
    snapshot
        .query_all(scope, &label_selector)
        .into_iter()
        .filter(|label| labels.matches(label.text_content()))
        .find_map(|label| {
            let by_for = label
                .attr("for")
                .filter(|target| !target.is_empty())
                .and_then(|target| snapshot.find_by_dom_id(target))
                .filter(|element| in_scope(element));
            by_for
                .or_else(|| snapshot.query(Some(label.id()), controls))
                .or_else(|| {
                    label
                        .next_element_sibling()
                        .filter(|sibling| sibling.matches(controls))
                })
                .map(|el| el.id())
        })
}

/// A strategy together with the name reported when it hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStrategy {
    name: &'static str,
    strategy: Strategy,
}

/// The element found by a [`LocatorChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Element found.
    pub node: NodeId,
    /// Name of the strategy that found it.
    pub strategy: &'static str,
}

/// Ordered list of strategies; first hit wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorChain {
    steps: Vec<NamedStrategy>,
}

impl LocatorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    #[must_use]
    pub fn then(mut self, name: &'static str, strategy: Strategy) -> Self {
        self.steps.push(NamedStrategy { name, strategy });
        self
    }

    /// Returns the strategy names in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|step| step.name)
    }

    /// Runs the strategies in order.
    #[must_use]
    pub fn locate(&self, snapshot: &DomSnapshot, scope: Option<NodeId>) -> Option<Located> {
        self.steps.iter().find_map(|step| {
            step.strategy
                .locate(snapshot, scope)
                .map(|node| Located {
                    node,
                    strategy: step.name,
                })
        })
    }
}
