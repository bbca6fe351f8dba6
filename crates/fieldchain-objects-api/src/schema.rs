//! Options from plugin JSON schemas

use fieldchain_options::{OptionKey, SelectOption};
use serde_json::Value;

/// Build options from a JSON schema property carrying `enum` and `enumNames`
///
/// Labels come from `enumNames` by position; values without a name use their
/// own text. Blank enum entries are skipped.
#[must_use]
pub fn choices_from_schema(property: &Value) -> Vec<SelectOption> {
    let Some(values) = property.get("enum").and_then(Value::as_array) else {
        return Vec::new();
    };
    let names = property
        .get("enumNames")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    values
        .iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let key = OptionKey::from_value(value)?;
            let label = names
                .get(i)
                .and_then(Value::as_str)
                .map_or_else(|| key.to_string(), str::to_string);
            Some(SelectOption::new(key, label))
        })
        .collect()
}
