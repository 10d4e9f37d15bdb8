//! Helpers for the host's item format.
//!
//! A node's input is either a single JSON object, a `{ "json": { … } }`
//! wrapped item, or an array of such items. Nodes act on the first item.

use serde_json::{Map, Value};

/// The first item of `input`, unwrapped from its `json` envelope if present.
pub fn first_item(input: &Value) -> Option<&Map<String, Value>> {
    let item = match input {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let map = item.as_object()?;
    match map.get("json") {
        Some(Value::Object(inner)) if map.len() == 1 => Some(inner),
        _ => Some(map),
    }
}

/// String field of `item`, if present and a string.
pub fn str_field<'a>(item: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

/// Non-negative integer field of `item`.
pub fn usize_field(item: &Map<String, Value>, key: &str) -> Option<usize> {
    item.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object_is_its_own_item() {
        let input = json!({ "row_number": 2 });
        assert_eq!(usize_field(first_item(&input).unwrap(), "row_number"), Some(2));
    }

    #[test]
    fn wrapped_and_listed_items_are_unwrapped() {
        let input = json!([{ "json": { "traceId": "t1" } }, { "json": { "traceId": "t2" } }]);
        assert_eq!(str_field(first_item(&input).unwrap(), "traceId"), Some("t1"));
    }

    #[test]
    fn json_key_next_to_other_fields_is_plain_data() {
        let input = json!({ "json": { "a": 1 }, "b": 2 });
        assert!(first_item(&input).unwrap().contains_key("b"));
    }

    #[test]
    fn non_objects_have_no_item() {
        assert!(first_item(&json!(null)).is_none());
        assert!(first_item(&json!([])).is_none());
        assert!(first_item(&json!("text")).is_none());
    }
}
