//! Namespaced properties.
//!
//! A key such as `@admin:field` only applies when `admin` is one of the
//! namespaces in effect. Applicable keys are renamed to `field`, the rest are
//! dropped, and ordinary keys pass through untouched.
//!
//! When several keys end up with the same name, a namespaced key beats the
//! plain one, and among namespaces the one listed later wins. The surviving
//! value sits where the name first appeared.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CompilerConfig;
use crate::value::{Map, Object, Value};

pub const CONCERN_PREFIX: char = '@';
pub const NAMESPACE_SEPARATOR: char = ':';

static NAMESPACE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("namespace pattern is valid"));

/// Whether `name` can be used as a namespace.
pub fn is_valid_namespace(name: &str) -> bool {
    NAMESPACE_NAME.is_match(name)
}

/// Normalize with the default `@` prefix and `:` separator.
pub fn normalize(namespaces: &[String], value: Value) -> Value {
    Normalizer::new(namespaces, CONCERN_PREFIX, NAMESPACE_SEPARATOR).normalize(value)
}

pub fn normalize_configured(namespaces: &[String], config: &CompilerConfig, value: Value) -> Value {
    Normalizer::new(namespaces, config.concern_prefix, config.namespace_separator).normalize(value)
}

pub struct Normalizer<'a> {
    namespaces: &'a [String],
    prefix: char,
    separator: char,
}

enum Key<'k> {
    Plain,
    /// Rank is 1 + the namespace's index in the active list.
    Applies { property: &'k str, rank: usize },
    Dropped,
}

impl<'a> Normalizer<'a> {
    pub fn new(namespaces: &'a [String], prefix: char, separator: char) -> Self {
        Self { namespaces, prefix, separator }
    }

    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Array(xs) => Value::Array(xs.into_iter().map(|x| self.normalize(x)).collect()),
            Value::Object(map) => Value::Object(self.normalize_object(map)),
            other => other,
        }
    }

    fn normalize_object(&self, map: Object) -> Object {
        let mut out = Map::new();
        let mut ranks: HashMap<String, usize> = HashMap::new();

        for (key, value) in map {
            let (name, rank) = match self.classify(&key) {
                Key::Plain => (key.clone(), 0),
                Key::Applies { property, rank } => (property.to_string(), rank),
                Key::Dropped => {
                    tracing::trace!(key = %key, "dropping key outside the active namespaces");
                    continue;
                }
            };
            let value = self.normalize(value);
            match ranks.get(&name) {
                Some(&existing) if existing >= rank => {}
                _ => {
                    ranks.insert(name.clone(), rank);
                    out.insert(name, value);
                }
            }
        }
        out
    }

    fn classify<'k>(&self, key: &'k str) -> Key<'k> {
        let Some(rest) = key.strip_prefix(self.prefix) else {
            return Key::Plain;
        };
        let Some((namespace, property)) = rest.split_once(self.separator) else {
            return Key::Plain;
        };
        if namespace.is_empty() {
            return Key::Plain;
        }
        match self.namespaces.iter().position(|n| n == namespace) {
            Some(index) => Key::Applies { property, rank: index + 1 },
            None => Key::Dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filters_by_active_namespaces() {
        let v = json!({"@admin:x": 1, "@user:y": 2, "z": 3});
        assert_eq!(normalize(&ns(&["admin"]), v), json!({"x": 1, "z": 3}));
    }

    #[test]
    fn no_namespaces_drops_every_namespaced_key() {
        let v = json!({"@admin:x": 1, "z": {"@user:y": 2, "w": 4}});
        assert_eq!(normalize(&[], v), json!({"z": {"w": 4}}));
    }

    #[test]
    fn recurses_into_arrays_and_objects() {
        let v = json!({"properties": {"a": {"@ts:type": "Date", "type": "string"}}, "list": [{"@ts:k": 1}]});
        assert_eq!(
            normalize(&ns(&["ts"]), v),
            json!({"properties": {"a": {"type": "Date"}}, "list": [{"k": 1}]})
        );
    }

    #[test]
    fn namespaced_key_overrides_plain_key_in_either_order() {
        let v = json!({"@sql:type": "TEXT", "type": "string", "n": 1});
        let out = normalize(&ns(&["sql"]), v);
        assert_eq!(out, json!({"type": "TEXT", "n": 1}));

        let v = json!({"type": "string", "@sql:type": "TEXT"});
        assert_eq!(normalize(&ns(&["sql"]), v), json!({"type": "TEXT"}));
    }

    #[test]
    fn later_namespace_wins() {
        let v = json!({"@b:x": "b", "@a:x": "a"});
        assert_eq!(normalize(&ns(&["a", "b"]), v.clone()), json!({"x": "b"}));
        assert_eq!(normalize(&ns(&["b", "a"]), v), json!({"x": "a"}));
    }

    #[test]
    fn prefix_without_separator_is_plain() {
        let v = json!({"@version": 2, "@:x": 1});
        assert_eq!(normalize(&ns(&["admin"]), v.clone()), v);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(normalize(&ns(&["a"]), json!("@a:x")), json!("@a:x"));
    }

    #[test]
    fn namespace_names() {
        assert!(is_valid_namespace("admin"));
        assert!(is_valid_namespace("ts_types-2"));
        assert!(!is_valid_namespace("a:b"));
        assert!(!is_valid_namespace(""));
        assert!(!is_valid_namespace("9lives"));
    }
}
