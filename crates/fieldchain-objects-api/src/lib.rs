//! fieldchain Objects API
//!
//! Option sources for the form builder's Objects API endpoints and the two
//! preset chains built from them:
//! - Registration: API group, object type, version, catalogue and document types
//! - Prefill: API group, object type, version and the version's properties
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldchain_core::{JsonFormStore, ModalGate};
//! use fieldchain_objects_api::{presets, ApiClient, ApiConfig};
//! use std::sync::Arc;
//!
//! let client = ApiClient::new(ApiConfig::new("https://forms.example.com"));
//! let chain = presets::registration_chain(&client, groups)
//!     .build(JsonFormStore::from_value(saved_options), Arc::new(ModalGate::new()))?;
//! chain.mount();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod client;
pub mod config;
pub mod presets;
pub mod schema;
pub mod sources;

// Re-exports for convenience
pub use client::ApiClient;
pub use config::{ApiConfig, ConfigError, FeatureFlags};
pub use presets::{prefill_chain, registration_chain, with_target_paths};
pub use schema::choices_from_schema;
pub use sources::{
    catalogue_key, target_path_key, target_path_segments, CataloguesSource, DocumentTypesSource,
    ObjectTypeVersionsSource, ObjectTypesSource, PrefillPropertiesSource, TargetPathsSource,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
