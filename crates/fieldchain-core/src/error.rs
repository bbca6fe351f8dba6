//! Error types for fieldchain core
//!
//! Provides error handling for:
//! - Chain construction (unknown fields, cycles)
//! - Confirmation gate policy violations
//!
//! Option fetch failures are not errors at this level: they end up as
//! [`crate::types::LoadState::Error`] on the affected field.

use fieldchain_options::FieldId;

/// Main chain error type
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Field is not part of the chain
    #[error("unknown field: {0}")]
    UnknownField(FieldId),

    /// Field registered twice
    #[error("duplicate field: {0}")]
    DuplicateField(FieldId),

    /// Edge from a field to itself
    #[error("field {0} cannot depend on itself")]
    SelfLoop(FieldId),

    /// Edge would make a field its own ancestor
    #[error("dependency {parent} -> {child} would create a cycle")]
    CycleDetected {
        /// Parent side of the rejected edge
        parent: FieldId,
        /// Child side of the rejected edge
        child: FieldId,
    },

    /// Confirmation gate failed
    #[error("confirmation failed: {0}")]
    Confirmation(#[from] ConfirmationError),
}

impl ChainError {
    /// Check if error indicates incorrect sequencing by the caller
    ///
    /// These are meant for a top-level handler rather than inline display.
    #[inline]
    #[must_use]
    pub fn is_programming_fault(&self) -> bool {
        matches!(
            self,
            Self::Confirmation(ConfirmationError::Concurrent)
                | Self::UnknownField(_)
                | Self::DuplicateField(_)
                | Self::SelfLoop(_)
                | Self::CycleDetected { .. }
        )
    }
}

/// Confirmation gate errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmationError {
    /// A confirmation was requested while another one is still open
    #[error("another confirmation is already pending")]
    Concurrent,

    /// Prompt went away without an answer
    #[error("confirmation dismissed without an answer")]
    Dismissed,
}
