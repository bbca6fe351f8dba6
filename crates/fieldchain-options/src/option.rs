//! Option and field identity types
//!
//! Defines the values a select field can hold:
//! - Field identifiers
//! - Option keys (numeric or textual, as the backend hands them out)
//! - Selectable options with opaque metadata
//! - Parent value mappings passed to option sources

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a selectable field within a chain
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    /// Create field id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Key of a selectable option
///
/// API groups and object type versions are numeric, object types and
/// document types are textual. Catalogues are persisted as a small record of
/// identifying fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionKey {
    /// Numeric key
    Int(i64),
    /// Textual key
    Text(String),
    /// Composite key made of string fields, e.g. `{domain, rsin}`
    Record(BTreeMap<String, String>),
}

impl OptionKey {
    /// Read a key from a form value
    ///
    /// `null`, the empty string and the empty object count as "no selection".
    /// Objects are only read when every member is a string; anything else
    /// is not a key.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            Value::Object(map) if !map.is_empty() => map
                .iter()
                .map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(Self::Record),
            _ => None,
        }
    }

    /// Build a record key from field pairs
    #[must_use]
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Convert into a form value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }

    /// Numeric view of the key, parsing textual digits
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
            Self::Record(_) => None,
        }
    }

    /// Member of a record key
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Record(fields) => fields.get(name).map(String::as_str),
            _ => None,
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Record(fields) => {
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for OptionKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for OptionKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A selectable option
///
/// Equality is by key only; label and metadata are presentation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option key
    pub key: OptionKey,
    /// Human-readable label
    pub label: String,
    /// Opaque payload from the backend
    #[serde(default)]
    pub metadata: Value,
}

impl SelectOption {
    /// Create option without metadata
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<OptionKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            metadata: Value::Null,
        }
    }

    /// Attach metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

impl PartialEq for SelectOption {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SelectOption {}

/// Selected values of a field's parents, keyed by parent field id
pub type ParentValues = BTreeMap<FieldId, OptionKey>;
