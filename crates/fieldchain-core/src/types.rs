//! Core types for fieldchain
//!
//! Defines the per-field state owned by the chain controller:
//! - Load state of a field's option list
//! - The selectable field snapshot
//! - Auto-selection policy applied after options load

use fieldchain_options::{FetchError, FieldId, OptionKey, SelectOption};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Budget for a single option fetch, in milliseconds
    pub fetch_timeout_ms: u64,
    /// Whether per-field [`AutoSelect`] policies are honoured
    pub auto_select: bool,
}

impl ChainConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fetch timeout
    #[inline]
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With auto-selection switched on or off
    #[inline]
    #[must_use]
    pub fn with_auto_select(mut self, enabled: bool) -> Self {
        self.auto_select = enabled;
        self
    }

    /// Fetch timeout as a duration
    #[inline]
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 30_000,
            auto_select: true,
        }
    }
}

/// Interaction state of a field node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeState {
    /// Accepting changes
    #[default]
    Ready,
    /// A change is suspended on the confirmation gate
    AwaitingConfirmation,
}

/// Load state of a field's option list
///
/// ```text
/// Idle --(parents complete)--> Loading --(ok)--> Loaded
///                              Loading --(err)--> Error
/// any --(parents incomplete)--> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadState {
    /// Nothing to load (parents incomplete) or not yet started
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Options available
    Loaded,
    /// Last fetch failed
    Error,
}

impl LoadState {
    /// Check if a fetch is in flight
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Check if a transition is allowed by the load state machine
    #[must_use]
    pub fn can_transition_to(&self, next: LoadState) -> bool {
        use LoadState::*;
        match (self, next) {
            // Parents becoming incomplete resets from anywhere
            (_, Idle) => true,
            // A (re)fetch starts from any state; Loading -> Loading supersedes
            (_, Loading) => true,
            (Loading, Loaded | Error) => true,
            _ => false,
        }
    }
}

/// Snapshot of one select field in a chain
#[derive(Debug, Clone, PartialEq)]
pub struct SelectableField {
    /// Field id
    pub id: FieldId,
    /// Current selection
    pub value: Option<OptionKey>,
    /// Options the field may take
    pub options: Vec<SelectOption>,
    /// Option list load state
    pub load_state: LoadState,
    /// Failure behind [`LoadState::Error`]
    pub error: Option<FetchError>,
}

impl SelectableField {
    /// Create empty field
    #[inline]
    #[must_use]
    pub fn new(id: FieldId) -> Self {
        Self {
            id,
            value: None,
            options: Vec::new(),
            load_state: LoadState::Idle,
            error: None,
        }
    }

    /// Check if the field holds a selection
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Option matching the current selection, if loaded
    #[must_use]
    pub fn selected_option(&self) -> Option<&SelectOption> {
        let value = self.value.as_ref()?;
        self.options.iter().find(|o| &o.key == value)
    }
}

/// Automatic selection applied to a field once its options load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSelect {
    /// Never select automatically
    #[default]
    Never,
    /// Select when exactly one option is available
    SingleOption,
    /// Select the first option
    First,
    /// Select the last (most recent) option
    Latest,
}

impl AutoSelect {
    /// Pick the option to select, if any
    #[must_use]
    pub fn pick<'a>(&self, options: &'a [SelectOption]) -> Option<&'a SelectOption> {
        match self {
            Self::Never => None,
            Self::SingleOption if options.len() == 1 => options.first(),
            Self::SingleOption => None,
            Self::First => options.first(),
            Self::Latest => options.last(),
        }
    }
}
