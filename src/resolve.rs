//! Fragment references.
//!
//! `{"$ref": "base.json"}` is replaced by the loaded fragment. With sibling
//! keys, `{"$ref": "base.json", "title": "x"}` becomes the fragment deep
//! merged with the siblings, the siblings winning at every depth.
//!
//! Resolution is deep: fragments may reference further fragments. Each branch
//! carries the chain of references it is currently inside, so a fragment that
//! reaches itself again fails with `CyclicRef` instead of recursing forever.
//! A fragment that is itself a bare marker is followed in a loop, so long
//! `$ref` to `$ref` chains cost no stack; fragments nested inside fragments
//! recurse and are capped by `max_ref_depth`.
//! Siblings in an array or object load concurrently; results are reassembled
//! in their original order.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use indexmap::IndexSet;

use crate::config::CompilerConfig;
use crate::context::Context;
use crate::error::{ErrorKind, StageResult};
use crate::loader::Loader;
use crate::namespace;
use crate::path;
use crate::value::{deep_merge, without_key, Object, Value};

/// Canonical keys of the fragments a branch is inside, outermost first.
type Chain = IndexSet<String>;

/// Resolve every reference in `document` with the context's loader.
pub async fn resolve(ctx: &Context, document: Value) -> StageResult<Value> {
    Resolver::new(ctx.loader.as_ref(), &ctx.config, &ctx.namespaces)
        .resolve(document)
        .await
}

pub struct Resolver<'a> {
    loader: &'a dyn Loader,
    config: &'a CompilerConfig,
    namespaces: &'a [String],
}

impl<'a> Resolver<'a> {
    pub fn new(loader: &'a dyn Loader, config: &'a CompilerConfig, namespaces: &'a [String]) -> Self {
        Self { loader, config, namespaces }
    }

    pub async fn resolve(&self, value: Value) -> StageResult<Value> {
        self.resolve_value(value, Chain::new(), 0).await
    }

    fn resolve_value(&self, value: Value, chain: Chain, depth: usize) -> BoxFuture<'_, StageResult<Value>> {
        async move {
            match value {
                Value::Array(xs) => {
                    let items =
                        try_join_all(xs.into_iter().map(|x| self.resolve_value(x, chain.clone(), depth))).await?;
                    Ok(Value::Array(items))
                }
                Value::Object(map) => self.resolve_object(map, chain, depth).await,
                other => Ok(other),
            }
        }
        .boxed()
    }

    /// The target of `map` when it holds a reference marker.
    fn marker_target(&self, map: &Object) -> StageResult<Option<String>> {
        match map.get(&self.config.ref_key) {
            None => Ok(None),
            Some(Value::String(target)) => Ok(Some(target.clone())),
            Some(other) => Err(ErrorKind::InvalidRef {
                path: other.to_string(),
                reason: format!("`{}` must be a string", self.config.ref_key),
            }),
        }
    }

    async fn resolve_object(&self, map: Object, chain: Chain, depth: usize) -> StageResult<Value> {
        let Some(target) = self.marker_target(&map)? else {
            return self.resolve_entries(map, chain, depth).await.map(Value::Object);
        };

        let siblings = without_key(map, &self.config.ref_key);
        let fragment = self.load_fragment(target.clone(), chain.clone(), depth).await?;
        if siblings.is_empty() {
            return Ok(fragment);
        }
        if !fragment.is_object() {
            return Err(ErrorKind::InvalidRef {
                path: target,
                reason: "fragment is not an object, so sibling keys cannot be merged into it".to_string(),
            });
        }
        let siblings = self.resolve_entries(siblings, chain, depth).await?;
        Ok(deep_merge(fragment, Value::Object(siblings)))
    }

    async fn resolve_entries(&self, map: Object, chain: Chain, depth: usize) -> StageResult<Object> {
        let (keys, values): (Vec<String>, Vec<Value>) = map.into_iter().unzip();
        let values =
            try_join_all(values.into_iter().map(|v| self.resolve_value(v, chain.clone(), depth))).await?;
        Ok(keys.into_iter().zip(values).collect())
    }

    async fn load_fragment(&self, target: String, mut chain: Chain, depth: usize) -> StageResult<Value> {
        if depth >= self.config.max_ref_depth {
            return Err(ErrorKind::TooDeep { at: target, limit: self.config.max_ref_depth });
        }

        let mut target = target;
        loop {
            let key = self.loader.key(&target);
            if chain.contains(&key) {
                let mut cycle: Vec<String> = chain.into_iter().collect();
                cycle.push(key);
                return Err(ErrorKind::CyclicRef { chain: cycle });
            }

            tracing::debug!(reference = %target, depth, hops = chain.len(), "loading fragment");
            let raw = self.loader.load(&target).await.map_err(|error| ErrorKind::InvalidRef {
                path: target.clone(),
                reason: error.to_string(),
            })?;

            // fragments use the same shorthand as the document that includes them
            let expanded = path::expand_configured(raw, self.config)?;
            let prepared = namespace::normalize_configured(self.namespaces, self.config, expanded);
            chain.insert(key);

            let next = match &prepared {
                Value::Object(map) if map.len() == 1 => self.marker_target(map)?,
                _ => None,
            };
            match next {
                Some(next) => target = next,
                None => return self.resolve_value(prepared, chain, depth + 1).await,
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
