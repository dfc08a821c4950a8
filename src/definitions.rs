//! Named definitions.
//!
//! A document may carry a top-level `definitions` object. Registration adds it
//! to the context; merging then replaces every usage, an object whose `type`
//! names a definition rather than a builtin type, with a copy of that
//! definition. Keys written next to `type` at the usage site override the
//! definition's own keys.
//!
//! A definition that is only another usage, `{"type": "Other"}`, is an alias
//! and is followed in a loop. Definitions nested inside definitions recurse
//! and are capped by `max_definition_depth`.

use indexmap::IndexSet;

use crate::context::Context;
use crate::error::{ErrorKind, StageResult};
use crate::schema::{DEFINITIONS, TYPE};
use crate::value::{deep_merge, without_key, Object, Value};

/// Names of the definitions being inlined, outermost first.
type Chain = IndexSet<String>;

/// Add the document's `definitions` to `ctx`.
///
/// Names `ctx` already knows keep their value. A missing or non-object
/// `definitions` leaves `ctx` as it is.
pub fn register(ctx: Context, document: &Value) -> Context {
    match document.get(DEFINITIONS) {
        Some(Value::Object(definitions)) => {
            tracing::debug!(count = definitions.len(), "registering definitions");
            ctx.add_definitions(definitions.clone())
        }
        _ => ctx,
    }
}

/// Inline every definition usage in `document`.
///
/// The top-level `definitions` key is dropped from the result. Running this
/// on a document with no usages left returns it unchanged.
pub fn merge(document: Value, ctx: &Context) -> StageResult<Value> {
    let document = match document {
        Value::Object(map) => Value::Object(without_key(map, DEFINITIONS)),
        other => other,
    };
    Merger { ctx }.merge(document, &mut Chain::new(), 0)
}

struct Merger<'a> {
    ctx: &'a Context,
}

impl Merger<'_> {
    fn usage<'v>(&self, map: &'v Object) -> Option<&'v str> {
        match map.get(TYPE) {
            Some(Value::String(name)) if !self.ctx.config.is_builtin_type(name) => Some(name),
            _ => None,
        }
    }

    fn merge(&self, value: Value, chain: &mut Chain, depth: usize) -> StageResult<Value> {
        match value {
            Value::Array(xs) => xs
                .into_iter()
                .map(|x| self.merge(x, chain, depth))
                .collect::<StageResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => self.merge_object(map, chain, depth),
            other => Ok(other),
        }
    }

    fn merge_entries(&self, map: Object, chain: &mut Chain, depth: usize) -> StageResult<Object> {
        map.into_iter()
            .map(|(key, value)| Ok((key, self.merge(value, chain, depth)?)))
            .collect()
    }

    fn merge_object(&self, map: Object, chain: &mut Chain, depth: usize) -> StageResult<Value> {
        let Some(name) = self.usage(&map).map(str::to_string) else {
            return self.merge_entries(map, chain, depth).map(Value::Object);
        };

        let start = chain.len();
        let resolved = self.inline(name.clone(), chain, depth);
        chain.truncate(start);
        let resolved = resolved?;

        let overrides = self.merge_entries(without_key(map, TYPE), chain, depth)?;
        if overrides.is_empty() {
            return Ok(resolved);
        }
        if !resolved.is_object() {
            tracing::warn!(definition = %name, "definition is not an object; ignoring keys at its usage");
            return Ok(resolved);
        }
        Ok(deep_merge(resolved, Value::Object(overrides)))
    }

    /// The merged body of definition `name`, following aliases without
    /// recursing. Every name visited is left on `chain`.
    fn inline(&self, mut name: String, chain: &mut Chain, depth: usize) -> StageResult<Value> {
        loop {
            let Some(definition) = self.ctx.definitions.get(&name) else {
                return Err(ErrorKind::UnresolvedDefinition { name });
            };
            if chain.contains(&name) {
                let mut cycle: Vec<String> = chain.iter().cloned().collect();
                cycle.push(name);
                return Err(ErrorKind::CyclicDefinition { chain: cycle });
            }
            chain.insert(name.clone());

            let alias = match definition {
                Value::Object(map) if map.len() == 1 => self.usage(map),
                _ => None,
            };
            if let Some(next) = alias {
                name = next.to_string();
                continue;
            }

            let limit = self.ctx.config.max_definition_depth;
            if depth >= limit {
                return Err(ErrorKind::TooDeep { at: name, limit });
            }
            return self.merge(definition.clone(), chain, depth + 1);
        }
    }
}
