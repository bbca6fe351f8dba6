//! Option source contract
//!
//! An option source turns the selected values of a field's parents into the
//! list of options that field may take. Sources are side-effect free from the
//! caller's point of view; repeated calls with identical parents may be served
//! from a cache (see [`crate::cache::CachedSource`]).

use crate::error::FetchError;
use crate::option::{FieldId, ParentValues, SelectOption};
use async_trait::async_trait;
use std::fmt::Debug;

/// Remote (or static) provider of selectable options
#[async_trait]
pub trait OptionSource: Send + Sync + Debug {
    /// Parent fields that must hold a value before a request is issued
    fn required_parents(&self) -> &[FieldId] {
        &[]
    }

    /// Fetch the options for a complete set of parent values
    ///
    /// Implementors may assume every required parent is present.
    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError>;

    /// Fetch options, short-circuiting when a required parent is missing
    ///
    /// Returns an empty list without issuing a request if any parent named by
    /// [`OptionSource::required_parents`] is absent.
    async fn fetch_options(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        if !parents_complete(self.required_parents(), parents) {
            tracing::debug!("Skipping option fetch, parent values incomplete");
            return Ok(Vec::new());
        }
        self.fetch(parents).await
    }
}

/// Check whether every required parent has a value
#[must_use]
pub fn parents_complete(required: &[FieldId], parents: &ParentValues) -> bool {
    required.iter().all(|id| parents.contains_key(id))
}

/// Source serving a fixed list regardless of parents
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    options: Vec<SelectOption>,
}

impl StaticSource {
    /// Create static source
    #[inline]
    #[must_use]
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }

    /// Options served by this source
    #[inline]
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }
}

#[async_trait]
impl OptionSource for StaticSource {
    async fn fetch(&self, _parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        Ok(self.options.clone())
    }
}
