//! Option sources backed by the Objects API endpoints
//!
//! Each source names the chain fields it reads its parameters from, so the
//! same source works in the registration editor and in the prefill editor.

use crate::client::ApiClient;
use async_trait::async_trait;
use fieldchain_options::{FetchError, FieldId, OptionKey, OptionSource, ParentValues, SelectOption};
use serde::Deserialize;
use serde_json::{json, Value};

const OBJECT_TYPES: &str = "/api/v2/objects-api/object-types";
const CATALOGUES: &str = "/api/v2/objects-api/catalogues";
const DOCUMENT_TYPES: &str = "/api/v2/objects-api/document-types";
const TARGET_PATHS: &str = "/api/v2/registration/plugins/objects-api/target-paths";
const PREFILL_OBJECTTYPES: &str = "/api/v2/prefill/plugins/objects-api/objecttypes";

/// Separator between path segments in target path labels
pub const PATH_LABEL_SEPARATOR: &str = " > ";

fn parent<'a>(parents: &'a ParentValues, id: &FieldId) -> Result<&'a OptionKey, FetchError> {
    parents
        .get(id)
        .ok_or_else(|| FetchError::Rejected(format!("missing value for {id}")))
}

fn group_query(group: &OptionKey) -> (&'static str, String) {
    ("objects_api_group", group.to_string())
}

/// Key a catalogue is persisted under: its domain and RSIN
#[must_use]
pub fn catalogue_key(domain: &str, rsin: &str) -> OptionKey {
    OptionKey::record([("domain", domain), ("rsin", rsin)])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectTypeDto {
    url: Option<String>,
    uuid: String,
    name: String,
    #[serde(default)]
    name_plural: Option<String>,
    #[serde(default)]
    data_classification: String,
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    version: i64,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct CatalogueDto {
    url: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    rsin: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentTypeDto {
    url: Option<String>,
    description: String,
    #[serde(default = "published")]
    is_published: bool,
}

fn published() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetPathDto {
    target_path: Vec<String>,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    json_schema: Value,
}

/// Option key of a target path: its segments as a JSON array
#[must_use]
pub fn target_path_key(segments: &[String]) -> OptionKey {
    OptionKey::Text(Value::from(segments.to_vec()).to_string())
}

/// Segments of a target path option
#[must_use]
pub fn target_path_segments(option: &SelectOption) -> Option<Vec<String>> {
    serde_json::from_value(option.metadata.get("targetPath")?.clone()).ok()
}

impl From<TargetPathDto> for SelectOption {
    fn from(dto: TargetPathDto) -> Self {
        SelectOption::new(
            target_path_key(&dto.target_path),
            dto.target_path.join(PATH_LABEL_SEPARATOR),
        )
        .with_metadata(json!({
            "targetPath": dto.target_path,
            "isRequired": dto.is_required,
            "jsonSchema": dto.json_schema,
        }))
    }
}

/// Object types available in an API group
///
/// Key: object type UUID. Label: `name (dataClassification)`.
#[derive(Debug, Clone)]
pub struct ObjectTypesSource {
    client: ApiClient,
    parents: [FieldId; 1],
}

impl ObjectTypesSource {
    /// Read the API group from `group`
    #[must_use]
    pub fn new(client: ApiClient, group: FieldId) -> Self {
        Self {
            client,
            parents: [group],
        }
    }
}

#[async_trait]
impl OptionSource for ObjectTypesSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group] = &self.parents;
        let query = [group_query(parent(parents, group)?)];
        let types: Vec<ObjectTypeDto> = self.client.get_json(OBJECT_TYPES, &query).await?;

        Ok(types
            .into_iter()
            .map(|t| {
                SelectOption::new(t.uuid, format!("{} ({})", t.name, t.data_classification))
                    .with_metadata(json!({"url": t.url, "namePlural": t.name_plural}))
            })
            .collect())
    }
}

/// Versions of an object type
///
/// Key: version number. Label: `version (status)`.
#[derive(Debug, Clone)]
pub struct ObjectTypeVersionsSource {
    client: ApiClient,
    parents: [FieldId; 2],
}

impl ObjectTypeVersionsSource {
    /// Read the API group from `group` and the object type UUID from `objecttype`
    #[must_use]
    pub fn new(client: ApiClient, group: FieldId, objecttype: FieldId) -> Self {
        Self {
            client,
            parents: [group, objecttype],
        }
    }
}

#[async_trait]
impl OptionSource for ObjectTypeVersionsSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group, objecttype] = &self.parents;
        let query = [group_query(parent(parents, group)?)];
        let path = format!("{OBJECT_TYPES}/{}/versions", parent(parents, objecttype)?);
        let versions: Vec<VersionDto> = self.client.get_json(&path, &query).await?;

        Ok(versions
            .into_iter()
            .map(|v| SelectOption::new(v.version, format!("{} ({})", v.version, v.status)))
            .collect())
    }
}

/// Catalogues available in an API group
///
/// Key: `{domain, rsin}`. Label: the catalogue label, or `domain (rsin)`.
/// The URL travels in the metadata.
#[derive(Debug, Clone)]
pub struct CataloguesSource {
    client: ApiClient,
    parents: [FieldId; 1],
}

impl CataloguesSource {
    /// Read the API group from `group`
    #[must_use]
    pub fn new(client: ApiClient, group: FieldId) -> Self {
        Self {
            client,
            parents: [group],
        }
    }
}

#[async_trait]
impl OptionSource for CataloguesSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group] = &self.parents;
        let query = [group_query(parent(parents, group)?)];
        let catalogues: Vec<CatalogueDto> = self.client.get_json(CATALOGUES, &query).await?;

        Ok(catalogues
            .into_iter()
            .map(|c| {
                let label = match c.label {
                    Some(label) if !label.is_empty() => label,
                    _ => format!("{} ({})", c.domain, c.rsin),
                };
                SelectOption::new(catalogue_key(&c.domain, &c.rsin), label)
                    .with_metadata(json!({"url": c.url, "domain": c.domain, "rsin": c.rsin}))
            })
            .collect())
    }
}

/// Document types within a catalogue
///
/// Key and label: the description. Unpublished types are only offered when
/// `include_drafts` is on.
#[derive(Debug, Clone)]
pub struct DocumentTypesSource {
    client: ApiClient,
    parents: [FieldId; 2],
}

impl DocumentTypesSource {
    /// Read the API group from `group` and the catalogue from `catalogue`
    ///
    /// The catalogue may be a `{domain, rsin}` key or a plain URL.
    #[must_use]
    pub fn new(client: ApiClient, group: FieldId, catalogue: FieldId) -> Self {
        Self {
            client,
            parents: [group, catalogue],
        }
    }

    async fn catalogue_url(&self, group: &OptionKey, catalogue: &OptionKey) -> Result<String, FetchError> {
        if !matches!(catalogue, OptionKey::Record(_)) {
            return Ok(catalogue.to_string());
        }
        let catalogues: Vec<CatalogueDto> = self.client.get_json(CATALOGUES, &[group_query(group)]).await?;
        catalogues
            .into_iter()
            .find(|c| {
                catalogue.field("domain") == Some(c.domain.as_str())
                    && catalogue.field("rsin") == Some(c.rsin.as_str())
            })
            .map(|c| c.url)
            .ok_or_else(|| FetchError::Rejected(format!("unknown catalogue {catalogue}")))
    }
}

#[async_trait]
impl OptionSource for DocumentTypesSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group, catalogue] = &self.parents;
        let group = parent(parents, group)?;
        let query = [
            ("catalogue_url", self.catalogue_url(group, parent(parents, catalogue)?).await?),
            group_query(group),
        ];
        let types: Vec<DocumentTypeDto> = self.client.get_json(DOCUMENT_TYPES, &query).await?;
        let include_drafts = self.client.config().feature_flags.include_drafts;

        Ok(types
            .into_iter()
            .filter(|t| include_drafts || t.is_published)
            .map(|t| {
                SelectOption::new(t.description.clone(), t.description)
                    .with_metadata(json!({"url": t.url, "isPublished": t.is_published}))
            })
            .collect())
    }
}

/// Registration target paths a variable may be mapped onto
///
/// Posts the variable's JSON schema; only paths whose schema is compatible
/// come back.
#[derive(Debug, Clone)]
pub struct TargetPathsSource {
    client: ApiClient,
    parents: [FieldId; 3],
    variable_schema: Value,
}

impl TargetPathsSource {
    /// Read group, object type and version from the given fields
    #[must_use]
    pub fn new(
        client: ApiClient,
        group: FieldId,
        objecttype: FieldId,
        version: FieldId,
        variable_schema: Value,
    ) -> Self {
        Self {
            client,
            parents: [group, objecttype, version],
            variable_schema,
        }
    }
}

#[async_trait]
impl OptionSource for TargetPathsSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group, objecttype, version] = &self.parents;
        let body = json!({
            "objectsApiGroup": parent(parents, group)?.to_value(),
            "objecttype": parent(parents, objecttype)?.to_value(),
            "objecttypeVersion": parent(parents, version)?.to_value(),
            "variableJsonSchema": self.variable_schema,
        });
        let paths: Vec<TargetPathDto> = self.client.post_json(TARGET_PATHS, &body).await?;
        Ok(paths.into_iter().map(SelectOption::from).collect())
    }
}

/// Properties of an object type version available for prefill
#[derive(Debug, Clone)]
pub struct PrefillPropertiesSource {
    client: ApiClient,
    parents: [FieldId; 3],
}

impl PrefillPropertiesSource {
    /// Read group, object type and version from the given fields
    #[must_use]
    pub fn new(client: ApiClient, group: FieldId, objecttype: FieldId, version: FieldId) -> Self {
        Self {
            client,
            parents: [group, objecttype, version],
        }
    }
}

#[async_trait]
impl OptionSource for PrefillPropertiesSource {
    fn required_parents(&self) -> &[FieldId] {
        &self.parents
    }

    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        let [group, objecttype, version] = &self.parents;
        let path = format!(
            "{PREFILL_OBJECTTYPES}/{}/versions/{}/properties",
            parent(parents, objecttype)?,
            parent(parents, version)?,
        );
        let query = [group_query(parent(parents, group)?)];
        let properties: Vec<TargetPathDto> = self.client.get_json(&path, &query).await?;
        Ok(properties.into_iter().map(SelectOption::from).collect())
    }
}
