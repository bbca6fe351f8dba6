//! Caching option source using moka
//!
//! Wraps another source and memoises successful responses by parent values.
//! Failures are never cached.

use crate::error::FetchError;
use crate::option::{FieldId, ParentValues, SelectOption};
use crate::source::OptionSource;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Option source memoising responses of an inner source
#[derive(Debug, Clone)]
pub struct CachedSource<S> {
    inner: S,
    cache: Cache<ParentValues, Arc<Vec<SelectOption>>>,
}

impl<S: OptionSource> CachedSource<S> {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(inner: S, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(inner: S, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Wrapped source
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop all memoised responses
    #[inline]
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            entry_count: self.cache.entry_count(),
        }
    }
}

#[async_trait]
impl<S: OptionSource> OptionSource for CachedSource<S> {
    fn required_parents(&self) -> &[FieldId] {
        self.inner.required_parents()
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        if let Some(cached) = self.cache.get(parents).await {
            return Ok(cached.as_ref().clone());
        }

        let options = self.inner.fetch(parents).await?;
        self.cache
            .insert(parents.clone(), Arc::new(options.clone()))
            .await;
        Ok(options)
    }
}
