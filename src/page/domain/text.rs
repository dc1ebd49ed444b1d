//! Text normalisation for label and content matching.

/// Collapses whitespace runs to one space, trims, and lowercases.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Tolerant matcher for human-readable labels.
///
/// A text matches when its normalised form equals or contains any
/// normalised candidate. Blank candidates are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    candidates: Vec<String>,
}

impl LabelMatcher {
    /// Creates a matcher for `candidates`.
    #[must_use]
    pub fn new<I, T>(candidates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            candidates: candidates
                .into_iter()
                .map(|candidate| normalize_text(candidate.as_ref()))
                .filter(|candidate| !candidate.is_empty())
                .collect(),
        }
    }

    /// Returns the normalised candidates.
    #[must_use]
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Returns `true` when `text` matches any candidate.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        self.candidates
            .iter()
            .any(|candidate| normalized.contains(candidate.as_str()))
    }
}
