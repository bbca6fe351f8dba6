//! Reset rules
//!
//! A [`ResetSpec`] states, per field, what must be cleared when that field's
//! value changes, and which of those targets are worth asking the user about
//! before the change is applied.

use fieldchain_options::{FieldId, OptionKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Something cleared when an ancestor changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTarget {
    /// Another select field in the chain
    Field(FieldId),
    /// Auxiliary form state, reset to `empty`
    Path {
        /// Form-store path
        path: String,
        /// Value written on reset
        empty: Value,
    },
}

impl ResetTarget {
    /// Target a chain field
    #[inline]
    #[must_use]
    pub fn field(id: impl Into<FieldId>) -> Self {
        Self::Field(id.into())
    }

    /// Target a list in the form store, reset to `[]`
    #[inline]
    #[must_use]
    pub fn list(path: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            empty: Value::Array(Vec::new()),
        }
    }

    /// Target arbitrary form state, reset to `empty`
    #[inline]
    #[must_use]
    pub fn path(path: impl Into<String>, empty: Value) -> Self {
        Self::Path {
            path: path.into(),
            empty,
        }
    }
}

/// What a field's change clears, and when to ask first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetSpec {
    /// Targets cleared when the change is applied
    pub targets: Vec<ResetTarget>,
    /// Targets inspected to decide on a prompt; `None` means all of `targets`
    pub confirm_when: Option<Vec<ResetTarget>>,
    /// Prompt shown to the user
    pub message: String,
}

impl ResetSpec {
    /// Create spec clearing `targets`, prompting when any holds a value
    #[inline]
    #[must_use]
    pub fn new(targets: Vec<ResetTarget>) -> Self {
        Self {
            targets,
            confirm_when: None,
            message: String::new(),
        }
    }

    /// Only prompt when one of `guard` holds a value
    ///
    /// An empty guard never prompts; targets are still cleared.
    #[inline]
    #[must_use]
    pub fn confirm_when(mut self, guard: Vec<ResetTarget>) -> Self {
        self.confirm_when = Some(guard);
        self
    }

    /// Prompt message
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check if there is nothing to reset
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets whose contents decide whether to prompt
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &[ResetTarget] {
        self.confirm_when.as_deref().unwrap_or(&self.targets)
    }
}

/// A change waiting for the user's confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    /// Field being changed
    pub field_id: FieldId,
    /// Value at the time the change was requested
    pub previous: Option<OptionKey>,
    /// Requested value
    pub proposed: Option<OptionKey>,
    /// Targets cleared on confirmation
    pub reset_targets: Vec<ResetTarget>,
    /// Prompt message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn guard_defaults_to_targets() {
        let spec = ResetSpec::new(vec![
            ResetTarget::field("version"),
            ResetTarget::list("variablesMapping"),
        ]);
        assert_eq!(spec.guard().len(), 2);

        let spec = spec.confirm_when(vec![ResetTarget::field("version")]);
        assert_eq!(spec.guard(), &[ResetTarget::field("version")]);
    }

    #[test]
    fn empty_guard_never_inspects() {
        let spec = ResetSpec::new(vec![ResetTarget::field("iotSubmissionReport")]).confirm_when(vec![]);
        assert!(spec.guard().is_empty());
        assert!(!spec.is_empty());
    }

    #[test]
    fn list_target_resets_to_empty_array() {
        assert_eq!(
            ResetTarget::list("options.authAttributePath"),
            ResetTarget::Path {
                path: "options.authAttributePath".to_string(),
                empty: json!([]),
            }
        );
    }
}
