//! Dotted-path shorthand.
//!
//! `{"a.b.c": 1}` is authored shorthand for `{"a": {"b": {"c": 1}}}`. Objects
//! are flattened into `(segments, leaf)` pairs and written back into a fresh
//! object one pair at a time. A key that needs a literal separator escapes it
//! as `\.` (and a literal backslash as `\\`).
//!
//! Two keys can claim the same location (`{"a": 1, "a.b": 2}`). By default
//! the pair written last in iteration order wins; [`expand_strict`] reports
//! the clash instead.

use crate::config::{CompilerConfig, PathConflicts};
use crate::error::{ErrorKind, StageResult};
use crate::value::{Map, Object, Value};

pub const PATH_SEPARATOR: char = '.';

const ESCAPE: char = '\\';

// ------------------------------- Front API -------------------------------- //

/// Expand dotted keys everywhere in `value` using `.` and last-write-wins.
pub fn expand(value: Value) -> Value {
    expand_with(value, PATH_SEPARATOR)
}

pub fn expand_with(value: Value, separator: char) -> Value {
    match Expander::new(separator, PathConflicts::LastWriteWins).expand(value) {
        Ok(value) => value,
        Err(_) => unreachable!("last-write-wins expansion never reports a conflict"),
    }
}

/// Like [`expand_with`] but fails on the first conflicting key.
pub fn expand_strict(value: Value, separator: char) -> StageResult<Value> {
    Expander::new(separator, PathConflicts::Reject).expand(value)
}

/// Expand according to the compiler settings.
pub fn expand_configured(value: Value, config: &CompilerConfig) -> StageResult<Value> {
    Expander::new(config.path_separator, config.path_conflicts).expand(value)
}

/// Write `leaf` at a dotted `path` inside `target`.
///
/// A non-object target, or a non-object value met along the way, is replaced
/// by an object.
pub fn set(target: Value, path: &str, leaf: Value, separator: char) -> Value {
    let mut root = match target {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let segments = tokenize(path, separator);
    if write(&mut root, &segments, leaf, PathConflicts::LastWriteWins).is_err() {
        unreachable!("last-write-wins writes never conflict");
    }
    Value::Object(root)
}

/// Split a key on unescaped separators, unescaping as it goes.
pub fn tokenize(key: &str, separator: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.peek() {
                Some(&next) if next == separator || next == ESCAPE => {
                    buf.push(next);
                    chars.next();
                }
                _ => buf.push(c),
            }
        } else if c == separator {
            segments.push(std::mem::take(&mut buf));
        } else {
            buf.push(c);
        }
    }
    segments.push(buf);
    segments
}

// ------------------------------- Expansion -------------------------------- //

struct Expander {
    separator: char,
    conflicts: PathConflicts,
}

impl Expander {
    fn new(separator: char, conflicts: PathConflicts) -> Self {
        Self { separator, conflicts }
    }

    fn expand(&self, value: Value) -> StageResult<Value> {
        match value {
            Value::Array(xs) => xs
                .into_iter()
                .map(|x| self.expand(x))
                .collect::<StageResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::new();
                for (path, leaf) in self.flatten(map)? {
                    write(&mut out, &path, leaf, self.conflicts).map_err(|clash| {
                        ErrorKind::MalformedShorthand {
                            key: join(&clash.path, self.separator),
                            reason: clash.reason.to_string(),
                        }
                    })?;
                }
                Ok(Value::Object(out))
            }
            other => Ok(other),
        }
    }

    fn flatten(&self, map: Object) -> StageResult<Vec<(Vec<String>, Value)>> {
        let mut out = Vec::new();
        self.flatten_into(map, &[], &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        map: Object,
        prefix: &[String],
        out: &mut Vec<(Vec<String>, Value)>,
    ) -> StageResult<()> {
        for (key, value) in map {
            let mut path = prefix.to_vec();
            path.extend(tokenize(&key, self.separator));
            match value {
                Value::Object(inner) if !inner.is_empty() => self.flatten_into(inner, &path, out)?,
                leaf => out.push((path, self.expand(leaf)?)),
            }
        }
        Ok(())
    }
}

// ------------------------------- Unflatten -------------------------------- //

struct Clash {
    path: Vec<String>,
    reason: &'static str,
}

fn write(root: &mut Object, path: &[String], leaf: Value, conflicts: PathConflicts) -> Result<(), Clash> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    let reject = conflicts == PathConflicts::Reject;

    let mut cursor = root;
    for (depth, segment) in parents.iter().enumerate() {
        let slot = cursor
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            if reject {
                return Err(Clash {
                    path: path[..=depth].to_vec(),
                    reason: "a scalar is also used as an object",
                });
            }
            *slot = Value::Object(Map::new());
        }
        cursor = match slot {
            Value::Object(next) => next,
            _ => unreachable!("slot was just made an object"),
        };
    }

    if reject && cursor.contains_key(last) {
        return Err(Clash {
            path: path.to_vec(),
            reason: "the same path is written more than once",
        });
    }
    cursor.insert(last.clone(), leaf);
    Ok(())
}

fn join(path: &[String], separator: char) -> String {
    path.join(&separator.to_string())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_objects_are_unchanged() {
        let v = json!({"type": "object", "properties": {"a": {"type": "string"}}, "list": [1, {"x": null}], "empty": {}});
        assert_eq!(expand(v.clone()), v);
    }

    #[test]
    fn dotted_keys_nest() {
        assert_eq!(expand(json!({"a.b.c": 1})), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn dotted_keys_merge_with_existing_objects() {
        let v = json!({"properties": {"id": {"type": "string"}}, "properties.name.type": "string"});
        assert_eq!(
            expand(v),
            json!({"properties": {"id": {"type": "string"}, "name": {"type": "string"}}})
        );
    }

    #[test]
    fn arrays_are_expanded_elementwise() {
        let v = json!([{"a.b": 1}, [{"c.d": 2}], 3]);
        assert_eq!(expand(v), json!([{"a": {"b": 1}}, [{"c": {"d": 2}}], 3]));
    }

    #[test]
    fn leaves_inside_objects_are_expanded() {
        let v = json!({"items": [{"x.y": true}]});
        assert_eq!(expand(v), json!({"items": [{"x": {"y": true}}]}));
    }

    #[test]
    fn escaped_separator_survives() {
        assert_eq!(expand(json!({"a\\.b": 1})), json!({"a.b": 1}));
        assert_eq!(expand(json!({"x.a\\.b.c": 1})), json!({"x": {"a.b": {"c": 1}}}));
        assert_eq!(tokenize("a\\\\.b", '.'), ["a\\", "b"]);
        assert_eq!(tokenize("a\\b", '.'), ["a\\b"]);
    }

    #[test]
    fn last_write_wins_by_iteration_order() {
        // scalar then path: the path replaces the scalar
        assert_eq!(expand(json!({"a": 1, "a.b": 2})), json!({"a": {"b": 2}}));
        // path then scalar: the scalar replaces the object
        assert_eq!(expand(json!({"a.b": 2, "a": 1})), json!({"a": 1}));
        // same full path twice
        assert_eq!(expand(json!({"a": {"b": 1}, "a.b": 2})), json!({"a": {"b": 2}}));
    }

    #[test]
    fn keys_keep_first_position() {
        let out = expand(json!({"a": 1, "z": 0, "a.b": 2}));
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "z"]);
    }

    #[test]
    fn strict_mode_reports_conflicts() {
        let err = expand_strict(json!({"a": 1, "a.b": 2}), '.').unwrap_err();
        assert_eq!(
            err,
            ErrorKind::MalformedShorthand {
                key: "a".into(),
                reason: "a scalar is also used as an object".into(),
            }
        );
        let err = expand_strict(json!({"a.b": 1, "a": {"b": 2}}), '.').unwrap_err();
        assert!(matches!(err, ErrorKind::MalformedShorthand { ref key, .. } if key == "a.b"));
        assert_eq!(expand_strict(json!({"a.b": 1, "a.c": 2}), '.').unwrap(), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn custom_separator() {
        assert_eq!(expand_with(json!({"a/b": 1, "c.d": 2}), '/'), json!({"a": {"b": 1}, "c.d": 2}));
    }

    #[test]
    fn set_writes_nested_values() {
        let v = set(json!({"a": {"b": 1}}), "a.c", json!(true), '.');
        assert_eq!(v, json!({"a": {"b": 1, "c": true}}));
        let v = set(json!(null), "x.y", json!("z"), '.');
        assert_eq!(v, json!({"x": {"y": "z"}}));
    }
}
