//! Path prefix matching.
//!
//! # Responsibilities
//! - Match request path prefix (case-sensitive)
//! - Report how specific a match is
//!
//! # Design Decisions
//! - Plain `starts_with` on the raw path; no normalization
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Length of the prefix; longer prefixes are more specific.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
