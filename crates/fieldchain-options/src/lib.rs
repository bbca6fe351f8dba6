//! fieldchain Options
//!
//! The leaf layer of a dependent field chain:
//! - Option keys, labels and metadata
//! - The [`OptionSource`] contract for loading options from parent selections
//! - A moka-backed [`CachedSource`] for memoising responses
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldchain_options::{OptionSource, ParentValues, SelectOption, StaticSource};
//!
//! # async fn example() -> Result<(), fieldchain_options::FetchError> {
//! let source = StaticSource::new(vec![SelectOption::new(1, "Objects API group 1")]);
//! let options = source.fetch_options(&ParentValues::new()).await?;
//! assert_eq!(options.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod error;
pub mod option;
pub mod source;

// Re-exports for convenience
pub use cache::{CacheStats, CachedSource};
pub use error::FetchError;
pub use option::{FieldId, OptionKey, ParentValues, SelectOption};
pub use source::{parents_complete, OptionSource, StaticSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
