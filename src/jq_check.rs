//! Checks written as jq expressions.
//!
//! The expression runs against the compiled document and must produce `true`
//! for every output, e.g. `.properties | has("id")`. An expression that fails
//! to parse, names an unknown filter or errors at runtime rejects the
//! document with that failure as the message.

use async_trait::async_trait;
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;

use crate::check::Check;
use crate::error::ValidationError;
use crate::value::Value;

type ParseErrors<'s> = Vec<(load::File<&'s str, ()>, load::Error<&'s str>)>;
type UndefinedErrors<'s> = Vec<(load::File<&'s str, ()>, Vec<(&'s str, Undefined)>)>;

/// A [`Check`] that passes when a jq expression yields only `true`.
#[derive(Debug, Clone)]
pub struct JqCheck {
    expr: String,
}

impl JqCheck {
    pub fn new(expr: impl Into<String>) -> Self {
        Self { expr: expr.into() }
    }

    fn reject(&self, message: impl Into<String>) -> ValidationError {
        ValidationError::new(&self.expr, message)
    }

    /// Every output of the expression over `document`.
    pub fn outputs(&self, document: &Value) -> Result<Vec<Value>, ValidationError> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let program = load::File { code: self.expr.as_str(), path: () };

        let modules = loader.load(&arena, program).map_err(|errs| self.syntax_error(errs))?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errs| self.undefined_error(errs))?;

        let inputs = RcIter::new(core::iter::empty());
        let outputs = filter
            .run((Ctx::new([], &inputs), Val::from(document.clone())))
            .map(|item| {
                let val = item.map_err(|e| self.reject(format!("runtime error: {e:?}")))?;
                // Val renders as JSON text
                serde_json::from_str(&val.to_string())
                    .map_err(|e| self.reject(format!("output is not JSON: {e}")))
            })
            .collect();
        outputs
    }

    fn syntax_error(&self, errs: ParseErrors<'_>) -> ValidationError {
        let messages: Vec<String> = errs.into_iter().map(|(_, err)| format!("parse error: {err:?}")).collect();
        self.reject(messages.join("; "))
    }

    fn undefined_error(&self, errs: UndefinedErrors<'_>) -> ValidationError {
        let messages: Vec<String> = errs
            .into_iter()
            .flat_map(|(_, list)| list)
            .map(|(name, undef)| format!("undefined `{name}`: {undef:?}"))
            .collect();
        self.reject(messages.join("; "))
    }
}

#[async_trait]
impl Check for JqCheck {
    fn name(&self) -> &str {
        &self.expr
    }

    async fn check(&self, document: Value) -> Result<Value, ValidationError> {
        let outputs = self.outputs(&document)?;
        if outputs.is_empty() {
            return Err(self.reject("expression produced no output"));
        }
        if let Some(other) = outputs.iter().find(|v| **v != Value::Bool(true)) {
            return Err(self.reject(format!("expression produced {other}, expected true")));
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outputs_are_json_values() {
        let out = JqCheck::new(".properties | keys[]").outputs(&json!({"properties": {"b": 1, "a": 2}})).unwrap();
        assert_eq!(out, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn broken_expressions_name_the_failure() {
        let err = JqCheck::new(".[").outputs(&json!({})).unwrap_err();
        assert_eq!(err.check, ".[");
        assert!(err.message.starts_with("parse error"));

        let err = JqCheck::new("no_such_filter").outputs(&json!({})).unwrap_err();
        assert!(err.message.contains("undefined `no_such_filter`"));

        let err = JqCheck::new(r#"error("boom")"#).outputs(&json!({})).unwrap_err();
        assert!(err.message.starts_with("runtime error"));
    }

    #[tokio::test]
    async fn true_passes_the_document_through() {
        let doc = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        let check = JqCheck::new(r#".properties | has("id")"#);
        assert_eq!(check.check(doc.clone()).await.unwrap(), doc);
    }

    #[tokio::test]
    async fn anything_but_true_is_a_rejection() {
        let doc = json!({"type": "object"});

        let err = JqCheck::new(r#"has("properties")"#).check(doc.clone()).await.unwrap_err();
        assert_eq!(err.check, r#"has("properties")"#);
        assert!(err.message.contains("false"));

        let err = JqCheck::new("empty").check(doc.clone()).await.unwrap_err();
        assert!(err.message.contains("no output"));

        let err = JqCheck::new(".type").check(doc).await.unwrap_err();
        assert!(err.message.contains("\"object\""));
    }
}
