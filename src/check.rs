//! Checks run against the fully expanded document.
//!
//! The runner always starts with [`StructureCheck`] and then folds the
//! caller's checks left to right. The first rejection stops the fold.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ValidationError;
use crate::schema::{ADDITIONAL_PROPERTIES, ITEMS, PROPERTIES, TYPE, VARIANTS};
use crate::value::{child_pointer, Value};

#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    /// Accept the document, possibly annotated, or reject it.
    async fn check(&self, document: Value) -> Result<Value, ValidationError>;
}

/// Run `checks` in order, feeding each one the previous output.
pub async fn run_chain(checks: &[Arc<dyn Check>], document: Value) -> Result<Value, ValidationError> {
    let mut document = document;
    for check in checks {
        tracing::debug!(check = check.name(), "running check");
        document = check.check(document).await?;
    }
    Ok(document)
}

/// Baseline structure check, then `checks`.
pub async fn run_checks(
    baseline: &StructureCheck,
    checks: &[Arc<dyn Check>],
    document: Value,
) -> Result<Value, ValidationError> {
    let document = baseline.check(document).await?;
    run_chain(checks, document).await
}

// ------------------------------- Closures --------------------------------- //

/// Adapts a plain function into a [`Check`].
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F> Check for FnCheck<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, document: Value) -> Result<Value, ValidationError> {
        (self.f)(document)
    }
}

// ------------------------------- Baseline --------------------------------- //

/// Structural sanity of a compiled document: an object root, object schema
/// nodes, string `type`s, object `properties` and no reference markers left.
#[derive(Debug, Clone)]
pub struct StructureCheck {
    ref_key: String,
}

impl Default for StructureCheck {
    fn default() -> Self {
        Self::new("$ref")
    }
}

impl StructureCheck {
    pub const NAME: &'static str = "structure";

    pub fn new(ref_key: impl Into<String>) -> Self {
        Self { ref_key: ref_key.into() }
    }

    fn fail(&self, pointer: &str, message: impl Into<String>) -> ValidationError {
        ValidationError::new(Self::NAME, message).at(pointer)
    }

    fn find_marker(&self, value: &Value, pointer: &str) -> Result<(), ValidationError> {
        match value {
            Value::Object(map) => {
                if map.contains_key(&self.ref_key) {
                    return Err(self.fail(pointer, format!("unresolved `{}` left in the document", self.ref_key)));
                }
                for (key, child) in map {
                    self.find_marker(child, &child_pointer(pointer, key))?;
                }
                Ok(())
            }
            Value::Array(xs) => {
                for (i, child) in xs.iter().enumerate() {
                    self.find_marker(child, &child_pointer(pointer, &i.to_string()))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn walk_schema(&self, node: &Value, pointer: &str) -> Result<(), ValidationError> {
        let Value::Object(map) = node else {
            return Err(self.fail(pointer, "schema must be an object"));
        };

        if let Some(ty) = map.get(TYPE) {
            if !ty.is_string() {
                return Err(self.fail(&child_pointer(pointer, TYPE), "`type` must be a string"));
            }
        }

        if let Some(properties) = map.get(PROPERTIES) {
            let here = child_pointer(pointer, PROPERTIES);
            let Value::Object(properties) = properties else {
                return Err(self.fail(&here, "`properties` must be an object"));
            };
            for (name, schema) in properties {
                self.walk_schema(schema, &child_pointer(&here, name))?;
            }
        }

        if let Some(items) = map.get(ITEMS) {
            let here = child_pointer(pointer, ITEMS);
            match items {
                Value::Array(tuple) => {
                    for (i, schema) in tuple.iter().enumerate() {
                        self.walk_schema(schema, &child_pointer(&here, &i.to_string()))?;
                    }
                }
                schema => self.walk_schema(schema, &here)?,
            }
        }

        if let Some(additional) = map.get(ADDITIONAL_PROPERTIES) {
            if !additional.is_boolean() {
                self.walk_schema(additional, &child_pointer(pointer, ADDITIONAL_PROPERTIES))?;
            }
        }

        if let Some(variants) = map.get(VARIANTS) {
            let here = child_pointer(pointer, VARIANTS);
            match variants {
                Value::Object(named) => {
                    for (name, schema) in named {
                        self.walk_schema(schema, &child_pointer(&here, name))?;
                    }
                }
                Value::Array(listed) => {
                    for (i, schema) in listed.iter().enumerate() {
                        self.walk_schema(schema, &child_pointer(&here, &i.to_string()))?;
                    }
                }
                _ => return Err(self.fail(&here, "`variants` must be an object or an array")),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Check for StructureCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self, document: Value) -> Result<Value, ValidationError> {
        if !document.is_object() {
            return Err(self.fail("", "document must be an object"));
        }
        self.find_marker(&document, "")?;
        self.walk_schema(&document, "")?;
        Ok(document)
    }
}

// ------------------------------- Tests ------------------------------------ //
