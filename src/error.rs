//! Error types for the compiler.
//!
//! Stages report an [`ErrorKind`]; the pipeline attaches the stage and a
//! snapshot of the [`Context`] in effect when the failure happened, giving a
//! [`CompileError`].

use serde::Serialize;
use thiserror::Error;

use crate::compiler::Stage;
use crate::context::Context;
use crate::value::{display_pointer, Object};

/// Result type for compilation
pub type Result<T> = std::result::Result<T, CompileError>;

/// Result type for a single stage, before context is attached
pub type StageResult<T> = std::result::Result<T, ErrorKind>;

/// What went wrong, with the offending path or name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("invalid reference `{path}`: {reason}")]
    InvalidRef { path: String, reason: String },

    #[error("cyclic reference: {}", .chain.join(" -> "))]
    CyclicRef { chain: Vec<String> },

    #[error("unresolved definition `{name}`")]
    UnresolvedDefinition { name: String },

    #[error("cyclic definition: {}", .chain.join(" -> "))]
    CyclicDefinition { chain: Vec<String> },

    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),

    #[error("malformed shorthand at `{key}`: {reason}")]
    MalformedShorthand { key: String, reason: String },

    #[error("plugin `{plugin}` failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error("`{at}` nests more than {limit} levels deep")]
    TooDeep { at: String, limit: usize },
}

impl ErrorKind {
    /// Stable tag naming the kind, without its payload.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRef { .. } => "InvalidRef",
            ErrorKind::CyclicRef { .. } => "CyclicRef",
            ErrorKind::UnresolvedDefinition { .. } => "UnresolvedDefinition",
            ErrorKind::CyclicDefinition { .. } => "CyclicDefinition",
            ErrorKind::ValidationFailed(_) => "ValidationFailed",
            ErrorKind::MalformedShorthand { .. } => "MalformedShorthand",
            ErrorKind::Plugin { .. } => "Plugin",
            ErrorKind::TooDeep { .. } => "TooDeep",
        }
    }

    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorKind::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// A check rejected the document.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("check `{check}` failed at {}: {message}", display_pointer(.pointer))]
pub struct ValidationError {
    /// Name of the rejecting check
    pub check: String,
    /// JSON pointer into the document; empty for the root
    pub pointer: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            pointer: String::new(),
            message: message.into(),
        }
    }

    pub fn at(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = pointer.into();
        self
    }
}

/// The parts of a [`Context`] worth keeping once compilation has failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub definitions: Object,
    pub namespaces: Vec<String>,
}

impl ContextSnapshot {
    pub fn of(ctx: &Context) -> Self {
        Self {
            definitions: ctx.definitions.clone(),
            namespaces: ctx.namespaces.clone(),
        }
    }

    pub fn definition_names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }
}

#[derive(Error, Debug, Clone)]
#[error("{stage} failed: {kind}")]
pub struct CompileError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub snapshot: ContextSnapshot,
}

impl CompileError {
    pub fn new(stage: Stage, kind: ErrorKind, ctx: &Context) -> Self {
        Self {
            stage,
            kind,
            snapshot: ContextSnapshot::of(ctx),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_chain_is_rendered_in_order() {
        let kind = ErrorKind::CyclicRef {
            chain: vec!["a.json".into(), "b.json".into(), "a.json".into()],
        };
        assert_eq!(kind.to_string(), "cyclic reference: a.json -> b.json -> a.json");
        assert_eq!(kind.tag(), "CyclicRef");
    }

    #[test]
    fn validation_error_names_root_as_slash() {
        let err = ValidationError::new("structure", "document must be an object");
        assert_eq!(err.to_string(), "check `structure` failed at /: document must be an object");
        let err = ValidationError::new("structure", "bad").at("/properties/a");
        assert!(err.to_string().contains("/properties/a"));
    }

    #[test]
    fn too_deep_names_where_it_stopped() {
        let kind = ErrorKind::TooDeep { at: "f32.json".into(), limit: 32 };
        assert_eq!(kind.to_string(), "`f32.json` nests more than 32 levels deep");
        assert_eq!(kind.tag(), "TooDeep");
    }

    #[test]
    fn validation_error_converts_to_kind() {
        let kind: ErrorKind = ValidationError::new("c", "m").into();
        assert_eq!(kind.tag(), "ValidationFailed");
    }
}
