//! Value model shared by every stage.
//!
//! Documents are plain `serde_json::Value`s built with `preserve_order`, so
//! objects keep their authored key order all the way to the output. Stages
//! consume a value and hand back a new one; nothing here mutates a caller's
//! value behind its back.

pub use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Key-wise deep merge where `overlay` wins.
///
/// Objects merge recursively; any other pairing (scalars, arrays, an object
/// over a scalar) is resolved by taking `overlay` wholesale. Keys already in
/// `base` keep their position, new keys are appended in `overlay` order.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => {
                        let previous = slot.take();
                        *slot = deep_merge(previous, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Drop one key while keeping the order of the rest.
///
/// `Map::remove` swaps the last entry into the hole under `preserve_order`.
pub fn without_key(map: Object, key: &str) -> Object {
    map.into_iter().filter(|(k, _)| k != key).collect()
}

/// Append one reference token to a JSON pointer (RFC 6901 escaping).
pub fn child_pointer(parent: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{parent}/{escaped}")
}

/// Human-facing rendering of a pointer; the root pointer is empty.
pub fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() { "/" } else { pointer }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_overrides_nested_keys() {
        let base = json!({"title": "base", "meta": {"a": 1, "b": 2}, "type": "object"});
        let overlay = json!({"meta": {"b": 3, "c": 4}, "title": "override"});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged, json!({"title": "override", "meta": {"a": 1, "b": 3, "c": 4}, "type": "object"}));
        let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["title", "meta", "type"]);
    }

    #[test]
    fn deep_merge_replaces_arrays_and_scalars() {
        assert_eq!(deep_merge(json!([1, 2]), json!([3])), json!([3]));
        assert_eq!(deep_merge(json!({"a": 1}), json!("x")), json!("x"));
        assert_eq!(deep_merge(json!(1), json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn without_key_keeps_order() {
        let map = json!({"a": 1, "b": 2, "c": 3}).as_object().cloned().unwrap();
        let map = without_key(map, "a");
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn pointers_escape_tokens() {
        assert_eq!(child_pointer("", "properties"), "/properties");
        assert_eq!(child_pointer("/properties", "a/b~c"), "/properties/a~1b~0c");
        assert_eq!(display_pointer(""), "/");
    }
}
