//! Short-form type declarations.
//!
//! Wherever the grammar expects a schema, a bare string names a type:
//! `"properties": {"id": "string"}` means `{"id": {"type": "string"}}`.

use crate::value::{Map, Value};

pub const TYPE: &str = "type";
pub const PROPERTIES: &str = "properties";
pub const DEFINITIONS: &str = "definitions";
pub const VARIANTS: &str = "variants";
pub const ITEMS: &str = "items";
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// Expand short-form types, treating `value` itself as a schema.
pub fn expand(value: Value) -> Value {
    expand_schema(value)
}

fn expand_schema(value: Value) -> Value {
    match value {
        Value::String(name) => {
            let mut map = Map::new();
            map.insert(TYPE.to_string(), Value::String(name));
            Value::Object(map)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, member)| {
                    let member = expand_member(&key, member);
                    (key, member)
                })
                .collect(),
        ),
        other => other,
    }
}

fn expand_member(key: &str, value: Value) -> Value {
    match key {
        PROPERTIES | DEFINITIONS => expand_schema_map(value),
        VARIANTS | ITEMS => match value {
            Value::Array(xs) => Value::Array(xs.into_iter().map(expand_schema).collect()),
            Value::Object(_) if key == VARIANTS => expand_schema_map(value),
            other => expand_schema(other),
        },
        ADDITIONAL_PROPERTIES => match value {
            Value::Bool(b) => Value::Bool(b),
            other => expand_schema(other),
        },
        _ => value,
    }
}

fn expand_schema_map(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, expand_schema(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn property_shorthand() {
        let v = json!({"type": "object", "properties": {"id": "string", "age": {"type": "number"}}});
        assert_eq!(
            expand(v),
            json!({"type": "object", "properties": {"id": {"type": "string"}, "age": {"type": "number"}}})
        );
    }

    #[test]
    fn items_and_nested_properties() {
        let v = json!({"properties": {"tags": {"type": "array", "items": "string"},
                                      "pair": {"type": "array", "items": ["number", "Name"]},
                                      "child": {"type": "object", "properties": {"x": "boolean"}}}});
        assert_eq!(
            expand(v),
            json!({"properties": {"tags": {"type": "array", "items": {"type": "string"}},
                                  "pair": {"type": "array", "items": [{"type": "number"}, {"type": "Name"}]},
                                  "child": {"type": "object", "properties": {"x": {"type": "boolean"}}}}})
        );
    }

    #[test]
    fn definitions_variants_and_additional_properties() {
        let v = json!({
            "definitions": {"Id": "string"},
            "variants": {"a": "A", "b": {"type": "B"}},
            "additionalProperties": "number"
        });
        assert_eq!(
            expand(v),
            json!({
                "definitions": {"Id": {"type": "string"}},
                "variants": {"a": {"type": "A"}, "b": {"type": "B"}},
                "additionalProperties": {"type": "number"}
            })
        );
        assert_eq!(
            expand(json!({"variants": ["A", "B"], "additionalProperties": false})),
            json!({"variants": [{"type": "A"}, {"type": "B"}], "additionalProperties": false})
        );
    }

    #[test]
    fn non_schema_positions_are_untouched() {
        let v = json!({"title": "string", "meta": {"properties": {"x": "y"}}, "type": "object", "enum": ["a"]});
        assert_eq!(expand(v.clone()), v);
    }

    #[test]
    fn root_string_is_a_schema() {
        assert_eq!(expand(json!("string")), json!({"type": "string"}));
        assert_eq!(expand(json!(3)), json!(3));
    }
}
