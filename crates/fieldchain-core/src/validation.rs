//! Validation error feed
//!
//! Externally supplied `(path, message)` pairs in the same path namespace as
//! the form store. The chain only reads them to decide what to show inline.

use serde::{Deserialize, Serialize};

/// Validation errors keyed by form path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    entries: Vec<(String, String)>,
}

impl ValidationErrors {
    /// Create empty feed
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error
    #[inline]
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, message: impl Into<String>) -> Self {
        self.entries.push((path.into(), message.into()));
        self
    }

    /// Messages for exactly `path`
    #[must_use]
    pub fn for_path(&self, path: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    /// Entries at or below `prefix`, with the prefix stripped
    #[must_use]
    pub fn filter_prefix(&self, prefix: &str) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(path, message)| {
                if path == prefix {
                    return Some(("", message.as_str()));
                }
                path.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| (rest, message.as_str()))
            })
            .collect()
    }

    /// Number of errors at or below `prefix`
    #[inline]
    #[must_use]
    pub fn count_under(&self, prefix: &str) -> usize {
        self.filter_prefix(prefix).len()
    }

    /// Check if there are no errors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
