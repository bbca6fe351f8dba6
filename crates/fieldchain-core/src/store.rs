//! Form-state store
//!
//! The chain is a consumer of the enclosing form's value store: it seeds field
//! values from it on mount and writes selections and resets back into it.
//! Paths are dot-separated (`options.objecttypeVersion`); numeric segments
//! index into arrays.

use serde_json::{Map, Value};
use std::fmt::Debug;

/// Value store of the enclosing form
pub trait FormStore: Send + Debug {
    /// Read the value at `path`
    fn get(&self, path: &str) -> Option<Value>;

    /// Write `value` at `path`, creating intermediate objects
    fn set(&mut self, path: &str, value: Value);

    /// Remove the value at `path`
    fn remove(&mut self, path: &str);
}

/// Check whether a form value counts as "nothing selected / nothing to lose"
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// In-memory [`FormStore`] over a JSON document
#[derive(Debug, Clone, PartialEq)]
pub struct JsonFormStore {
    values: Value,
}

impl JsonFormStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Value::Object(Map::new()),
        }
    }

    /// Create store seeded with persisted configuration
    #[inline]
    #[must_use]
    pub fn from_value(values: Value) -> Self {
        Self { values }
    }

    /// Full document
    #[inline]
    #[must_use]
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Consume store into its document
    #[inline]
    #[must_use]
    pub fn into_values(self) -> Value {
        self.values
    }
}

impl Default for JsonFormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStore for JsonFormStore {
    fn get(&self, path: &str) -> Option<Value> {
        let mut current = &self.values;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.values;
        for segment in parents {
            current = match child_slot(current, segment) {
                Some(child) => child,
                None => return,
            };
        }

        match current {
            Value::Array(items) => {
                if let Some(slot) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    *slot = value;
                }
            }
            Value::Object(map) => {
                map.insert((*last).to_string(), value);
            }
            other => {
                let mut map = Map::new();
                map.insert((*last).to_string(), value);
                *other = Value::Object(map);
            }
        }
    }

    fn remove(&mut self, path: &str) {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let container = match parent {
            Some(parent) => lookup_mut(&mut self.values, parent),
            None => Some(&mut self.values),
        };

        match container {
            Some(Value::Object(map)) => {
                map.remove(last);
            }
            Some(Value::Array(items)) => {
                if let Some(i) = last.parse::<usize>().ok().filter(|i| *i < items.len()) {
                    items.remove(i);
                }
            }
            _ => {}
        }
    }
}

fn lookup_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(root, |target, segment| match target {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

/// Step into `segment`, turning scalars into objects along the way
fn child_slot<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    if !matches!(value, Value::Array(_) | Value::Object(_)) {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        Value::Object(map) => Some(
            map.entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn get_nested_and_indexed() {
        let store = JsonFormStore::from_value(json!({
            "options": {
                "objectsApiGroup": 1,
                "variablesMapping": [{"variableKey": "a", "targetPath": ["x"]}]
            }
        }));

        assert_eq!(store.get("options.objectsApiGroup"), Some(json!(1)));
        assert_eq!(
            store.get("options.variablesMapping.0.variableKey"),
            Some(json!("a"))
        );
        assert_eq!(store.get("options.missing"), None);
        assert_eq!(store.get("options.objectsApiGroup.deeper"), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut store = JsonFormStore::new();
        store.set("options.objecttypeUuid", json!("tree"));
        store.set("options.objecttypeVersion", json!(2));

        assert_eq!(
            store.values(),
            &json!({"options": {"objecttypeUuid": "tree", "objecttypeVersion": 2}})
        );
    }

    #[test]
    fn set_into_existing_array_item() {
        let mut store = JsonFormStore::from_value(json!({"mapping": [{"targetPath": ["a"]}]}));
        store.set("mapping.0.targetPath", json!(["b"]));
        assert_eq!(store.get("mapping.0.targetPath"), Some(json!(["b"])));

        // out of range is ignored rather than padding the array
        store.set("mapping.3.targetPath", json!(["c"]));
        assert_eq!(store.get("mapping"), Some(json!([{"targetPath": ["b"]}])));
    }

    #[test]
    fn remove_key_and_array_item() {
        let mut store = JsonFormStore::from_value(json!({
            "options": {"objecttypeVersion": 2, "variablesMapping": ["a", "b"]}
        }));

        store.remove("options.objecttypeVersion");
        store.remove("options.variablesMapping.0");
        store.remove("options.not.there");

        assert_eq!(store.values(), &json!({"options": {"variablesMapping": ["b"]}}));
    }

    #[test]
    fn blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!([])));
        assert!(is_blank(&json!({})));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
        assert!(!is_blank(&json!([{"variableKey": "a"}])));
    }
}
