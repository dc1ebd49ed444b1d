//! CSS selectors used to address third-party markup.
//!
//! [`Selector`] only carries selector text; matching is delegated to
//! [`scraper`] when a [`DomSnapshot`](super::DomSnapshot) is queried.

use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Selector text rejected by the CSS parser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid selector '{selector}': {message}")]
pub struct InvalidSelector {
    /// The rejected text.
    pub selector: String,
    /// Parser diagnostic.
    pub message: String,
}

/// A validated or programmatically built selector list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    css: String,
}

impl Selector {
    /// Parses and validates selector text.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSelector`] when the CSS parser rejects `input`.
    pub fn parse(input: &str) -> Result<Self, InvalidSelector> {
        let css = input.trim();
        scraper::Selector::parse(css).map_err(|err| InvalidSelector {
            selector: input.to_owned(),
            message: err.to_string(),
        })?;
        Ok(Self {
            css: css.to_owned(),
        })
    }

    /// Starts a selector matching elements with the given tag.
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            css: tag.to_ascii_lowercase(),
        }
    }

    /// Starts a selector matching any element (`*`).
    #[must_use]
    pub fn any() -> Self {
        Self { css: "*".to_owned() }
    }

    /// Shorthand for `[name="value"]` on the rightmost compound.
    #[must_use]
    pub fn attr_eq(self, name: &str, value: &str) -> Self {
        self.with_attribute(name, "=", value)
    }

    /// Shorthand for `[name*="value"]` on the rightmost compound.
    #[must_use]
    pub fn attr_contains(self, name: &str, value: &str) -> Self {
        self.with_attribute(name, "*=", value)
    }

    fn with_attribute(mut self, name: &str, operator: &str, value: &str) -> Self {
        self.css.push('[');
        self.css.push_str(name);
        self.css.push_str(operator);
        self.css.push('"');
        for c in value.chars() {
            if matches!(c, '"' | '\\') {
                self.css.push('\\');
            }
            self.css.push(c);
        }
        self.css.push_str("\"]");
        self
    }

    /// Appends a descendant step: `self other`.
    ///
    /// `other` should be a single complex selector; a list would bind its
    /// later alternatives at top level.
    #[must_use]
    pub fn descendant(mut self, other: Self) -> Self {
        self.css.push(' ');
        self.css.push_str(&other.css);
        self
    }

    /// Adds `other` as an alternative: `self, other`.
    #[must_use]
    pub fn or(mut self, other: Self) -> Self {
        self.css.push_str(", ");
        self.css.push_str(&other.css);
        self
    }

    /// Returns the selector text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.css
    }

    /// Compiles the selector for matching; rejected text matches nothing.
    pub(crate) fn compile(&self) -> Option<scraper::Selector> {
        match scraper::Selector::parse(&self.css) {
            Ok(compiled) => Some(compiled),
            Err(err) => {
                warn!(selector = %self.css, error = %err, "selector rejected");
                None
            }
        }
    }
}

impl std::str::FromStr for Selector {
    type Err = InvalidSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css)
    }
}
