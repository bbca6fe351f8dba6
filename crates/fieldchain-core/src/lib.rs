//! fieldchain Core
//!
//! Dependent select fields whose option lists derive from the selections of
//! their parents. The [`ChainController`] keeps a chain consistent:
//!
//! - Changing a field clears every field and piece of form state derived from
//!   its old value
//! - Changes that would discard user data wait on a [`ConfirmationGate`]
//! - Option lists reload for the children of changed fields, and a result
//!   that arrives after a newer fetch started is discarded
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldchain_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(versions: Arc<dyn OptionSource>) -> Result<(), ChainError> {
//! let chain = ChainBuilder::new()
//!     .field(
//!         FieldSpec::new("objecttype")
//!             .bind("objecttype")
//!             .reset(ResetSpec::new(vec![ResetTarget::field("version")])),
//!     )
//!     .field(FieldSpec::new("version").bind("objecttypeVersion").source(versions))
//!     .depends_on("version", "objecttype")
//!     .build(JsonFormStore::new(), Arc::new(ModalGate::new()))?;
//!
//! chain.mount();
//! chain.set_value(&FieldId::new("objecttype"), Some("tree".into())).await?;
//! chain.wait_idle().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod controller;
pub mod error;
pub mod gate;
pub mod graph;
pub mod reset;
pub mod store;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use controller::{ChainBuilder, ChainController, ChangeOutcome, FieldSpec};
pub use error::{ChainError, ConfirmationError};
pub use gate::{ConfirmationGate, ModalGate, Prompt};
pub use graph::DependencyGraph;
pub use reset::{PendingChange, ResetSpec, ResetTarget};
pub use store::{is_blank, FormStore, JsonFormStore};
pub use types::{AutoSelect, ChainConfig, LoadState, NodeState, SelectableField};
pub use validation::ValidationErrors;

/// Commonly used items
pub mod prelude {
    pub use crate::controller::{ChainBuilder, ChainController, ChangeOutcome, FieldSpec};
    pub use crate::error::{ChainError, ConfirmationError};
    pub use crate::gate::{ConfirmationGate, ModalGate};
    pub use crate::reset::{ResetSpec, ResetTarget};
    pub use crate::store::{FormStore, JsonFormStore};
    pub use crate::types::{AutoSelect, ChainConfig, LoadState};
    pub use fieldchain_options::{FetchError, FieldId, OptionKey, OptionSource, SelectOption};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
