//! Preset chains for the Objects API editors
//!
//! Both presets return a [`ChainBuilder`], so callers can add fields (or
//! swap the configuration) before building.

use crate::client::ApiClient;
use crate::sources::{
    CataloguesSource, DocumentTypesSource, ObjectTypeVersionsSource, ObjectTypesSource,
    PrefillPropertiesSource, TargetPathsSource,
};
use fieldchain_core::{AutoSelect, ChainBuilder, FieldSpec, ResetSpec, ResetTarget};
use fieldchain_options::{CachedSource, FieldId, SelectOption};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Prompt shown before a group change drops the variables mapping
pub const API_GROUP_CHANGE_MESSAGE: &str = "Changing the api group will remove the existing variables mapping. Are you sure you want to continue?";

/// Prompt shown before an object type or version change drops the variables mapping
pub const OBJECTTYPE_CHANGE_MESSAGE: &str = "Changing the objecttype will remove the existing variables mapping. Are you sure you want to continue?";

const DOCUMENT_TYPE_CACHE_CAPACITY: u64 = 64;
const DOCUMENT_TYPE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Registration backend options
pub mod registration {
    /// API group field and path
    pub const API_GROUP: &str = "objectsApiGroup";
    /// Object type field and path
    pub const OBJECTTYPE: &str = "objecttype";
    /// Object type version field and path
    pub const OBJECTTYPE_VERSION: &str = "objecttypeVersion";
    /// Catalogue field and path
    pub const CATALOGUE: &str = "catalogue";
    /// Submission report document type field and path
    pub const IOT_SUBMISSION_REPORT: &str = "iotSubmissionReport";
    /// Submission CSV document type field and path
    pub const IOT_SUBMISSION_CSV: &str = "iotSubmissionCsv";
    /// Attachment document type field and path
    pub const IOT_ATTACHMENT: &str = "iotAttachment";
    /// Variables mapping path
    pub const VARIABLES_MAPPING: &str = "variablesMapping";

    /// Document type fields, all fed from the selected catalogue
    pub const DOCUMENT_TYPES: [&str; 3] = [IOT_SUBMISSION_REPORT, IOT_SUBMISSION_CSV, IOT_ATTACHMENT];

    /// Field listing the target paths for a variable
    #[must_use]
    pub fn target_path_field(variable_key: &str) -> String {
        format!("targetPath.{variable_key}")
    }
}

/// Prefill plugin options
pub mod prefill {
    /// API group field id
    pub const API_GROUP: &str = "objectsApiGroup";
    /// Object type field id
    pub const OBJECTTYPE: &str = "objecttypeUuid";
    /// Object type version field id
    pub const OBJECTTYPE_VERSION: &str = "objecttypeVersion";
    /// Available properties field id (not stored)
    pub const PROPERTIES: &str = "prefillProperties";

    /// API group path
    pub const API_GROUP_PATH: &str = "options.objectsApiGroup";
    /// Object type path
    pub const OBJECTTYPE_PATH: &str = "options.objecttypeUuid";
    /// Object type version path
    pub const OBJECTTYPE_VERSION_PATH: &str = "options.objecttypeVersion";
    /// Authentication attribute path
    pub const AUTH_ATTRIBUTE_PATH: &str = "options.authAttributePath";
    /// Variables mapping path
    pub const VARIABLES_MAPPING: &str = "options.variablesMapping";
}

/// Chain for the registration backend's Objects API options
///
/// Group, object type and version, plus catalogue and the three document
/// types. `api_groups` are the configured groups; a single group is selected
/// automatically. Object type and version default to the first type and its
/// latest version, and a saved value the API no longer offers is replaced
/// the same way.
#[must_use]
pub fn registration_chain(client: &ApiClient, api_groups: Vec<SelectOption>) -> ChainBuilder {
    use registration::*;

    let group = FieldId::new(API_GROUP);
    let objecttype = FieldId::new(OBJECTTYPE);
    let catalogue = FieldId::new(CATALOGUE);

    let mut group_targets = vec![
        ResetTarget::field(OBJECTTYPE),
        ResetTarget::field(OBJECTTYPE_VERSION),
        ResetTarget::list(VARIABLES_MAPPING),
        ResetTarget::field(CATALOGUE),
    ];
    group_targets.extend(DOCUMENT_TYPES.iter().map(|id| ResetTarget::field(*id)));

    let document_types = Arc::new(CachedSource::with_ttl(
        DocumentTypesSource::new(client.clone(), group.clone(), catalogue.clone()),
        DOCUMENT_TYPE_CACHE_CAPACITY,
        DOCUMENT_TYPE_CACHE_TTL,
    ));

    let mut builder = ChainBuilder::new()
        .field(
            FieldSpec::new(API_GROUP)
                .bind(API_GROUP)
                .options(api_groups)
                .auto_select(AutoSelect::SingleOption)
                .reset(
                    ResetSpec::new(group_targets)
                        .confirm_when(vec![ResetTarget::field(OBJECTTYPE)])
                        .with_message(API_GROUP_CHANGE_MESSAGE),
                ),
        )
        .field(
            FieldSpec::new(OBJECTTYPE)
                .bind(OBJECTTYPE)
                .source(Arc::new(ObjectTypesSource::new(client.clone(), group.clone())))
                .auto_select(AutoSelect::First)
                .replace_missing(true)
                .reset(
                    ResetSpec::new(vec![
                        ResetTarget::field(OBJECTTYPE_VERSION),
                        ResetTarget::list(VARIABLES_MAPPING),
                    ])
                    .confirm_when(vec![ResetTarget::list(VARIABLES_MAPPING)])
                    .with_message(OBJECTTYPE_CHANGE_MESSAGE),
                ),
        )
        .field(
            FieldSpec::new(OBJECTTYPE_VERSION)
                .bind(OBJECTTYPE_VERSION)
                .source(Arc::new(ObjectTypeVersionsSource::new(
                    client.clone(),
                    group.clone(),
                    objecttype,
                )))
                .auto_select(AutoSelect::Latest)
                .replace_missing(true)
                .reset(
                    ResetSpec::new(vec![ResetTarget::list(VARIABLES_MAPPING)])
                        .with_message(OBJECTTYPE_CHANGE_MESSAGE),
                ),
        )
        .field(
            FieldSpec::new(CATALOGUE)
                .bind(CATALOGUE)
                .source(Arc::new(CataloguesSource::new(client.clone(), group)))
                .reset(
                    ResetSpec::new(DOCUMENT_TYPES.iter().map(|id| ResetTarget::field(*id)).collect())
                        .confirm_when(Vec::new()),
                ),
        )
        .depends_on(OBJECTTYPE, API_GROUP)
        .depends_on(OBJECTTYPE_VERSION, API_GROUP)
        .depends_on(OBJECTTYPE_VERSION, OBJECTTYPE)
        .depends_on(CATALOGUE, API_GROUP);

    for id in DOCUMENT_TYPES {
        builder = builder
            .field(FieldSpec::new(id).bind(id).source(document_types.clone()))
            .depends_on(id, API_GROUP)
            .depends_on(id, CATALOGUE);
    }
    builder
}

/// Add a field listing the registration target paths for one variable
///
/// The field is not stored; it reloads whenever group, object type or
/// version change.
#[must_use]
pub fn with_target_paths(
    builder: ChainBuilder,
    client: &ApiClient,
    variable_key: &str,
    variable_schema: Value,
) -> ChainBuilder {
    use registration::*;

    let id = target_path_field(variable_key);
    builder
        .field(FieldSpec::new(id.as_str()).source(Arc::new(TargetPathsSource::new(
            client.clone(),
            FieldId::new(API_GROUP),
            FieldId::new(OBJECTTYPE),
            FieldId::new(OBJECTTYPE_VERSION),
            variable_schema,
        ))))
        .depends_on(id.as_str(), API_GROUP)
        .depends_on(id.as_str(), OBJECTTYPE)
        .depends_on(id.as_str(), OBJECTTYPE_VERSION)
}

/// Chain for the Objects API prefill plugin options
#[must_use]
pub fn prefill_chain(client: &ApiClient, api_groups: Vec<SelectOption>) -> ChainBuilder {
    use prefill::*;

    let group = FieldId::new(API_GROUP);
    let objecttype = FieldId::new(OBJECTTYPE);
    let version = FieldId::new(OBJECTTYPE_VERSION);

    ChainBuilder::new()
        .field(
            FieldSpec::new(API_GROUP)
                .bind(API_GROUP_PATH)
                .options(api_groups)
                .auto_select(AutoSelect::SingleOption)
                .reset(
                    ResetSpec::new(vec![
                        ResetTarget::field(OBJECTTYPE),
                        ResetTarget::field(OBJECTTYPE_VERSION),
                        ResetTarget::list(AUTH_ATTRIBUTE_PATH),
                        ResetTarget::list(VARIABLES_MAPPING),
                    ])
                    .confirm_when(vec![ResetTarget::field(OBJECTTYPE)])
                    .with_message(API_GROUP_CHANGE_MESSAGE),
                ),
        )
        .field(
            FieldSpec::new(OBJECTTYPE)
                .bind(OBJECTTYPE_PATH)
                .source(Arc::new(ObjectTypesSource::new(client.clone(), group.clone())))
                .auto_select(AutoSelect::First)
                .replace_missing(true)
                .reset(
                    ResetSpec::new(vec![
                        ResetTarget::field(OBJECTTYPE_VERSION),
                        ResetTarget::list(AUTH_ATTRIBUTE_PATH),
                        ResetTarget::list(VARIABLES_MAPPING),
                    ])
                    .confirm_when(vec![ResetTarget::list(VARIABLES_MAPPING)])
                    .with_message(OBJECTTYPE_CHANGE_MESSAGE),
                ),
        )
        .field(
            FieldSpec::new(OBJECTTYPE_VERSION)
                .bind(OBJECTTYPE_VERSION_PATH)
                .source(Arc::new(ObjectTypeVersionsSource::new(
                    client.clone(),
                    group.clone(),
                    objecttype.clone(),
                )))
                .auto_select(AutoSelect::Latest)
                .replace_missing(true)
                .reset(
                    ResetSpec::new(vec![ResetTarget::list(VARIABLES_MAPPING)])
                        .with_message(OBJECTTYPE_CHANGE_MESSAGE),
                ),
        )
        .field(FieldSpec::new(PROPERTIES).source(Arc::new(PrefillPropertiesSource::new(
            client.clone(),
            group,
            objecttype,
            version,
        ))))
        .depends_on(OBJECTTYPE, API_GROUP)
        .depends_on(OBJECTTYPE_VERSION, API_GROUP)
        .depends_on(OBJECTTYPE_VERSION, OBJECTTYPE)
        .depends_on(PROPERTIES, API_GROUP)
        .depends_on(PROPERTIES, OBJECTTYPE)
        .depends_on(PROPERTIES, OBJECTTYPE_VERSION)
}
