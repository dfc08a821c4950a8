//! Compiler settings.
//!
//! Everything has a default; a settings file only needs the keys it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path_de::{from_str_with_path, ParseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Splits dotted-path keys (`a.b.c`)
    pub path_separator: char,

    /// Marks namespaced keys (`@admin:field`)
    pub concern_prefix: char,

    /// Separates the namespace from the property name
    pub namespace_separator: char,

    /// Key of a reference marker
    pub ref_key: String,

    /// `type` names that never refer to a definition
    pub builtin_types: Vec<String>,

    /// What path expansion does when two keys claim the same location
    pub path_conflicts: PathConflicts,

    /// How many fragments may nest inside one another. Plain `$ref` to `$ref`
    /// hops are followed in a loop and do not count.
    pub max_ref_depth: usize,

    /// How many definitions may nest inside one another. Aliases such as
    /// `{"type": "Other"}` are followed in a loop and do not count.
    pub max_definition_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathConflicts {
    /// The key written last in iteration order wins
    #[default]
    LastWriteWins,
    /// Fail with `MalformedShorthand`
    Reject,
}

pub const BUILTIN_TYPES: &[&str] = &[
    "null", "boolean", "number", "integer", "string", "object", "array", "sum", "any",
];

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path_separator: '.',
            concern_prefix: '@',
            namespace_separator: ':',
            ref_key: "$ref".to_string(),
            builtin_types: BUILTIN_TYPES.iter().map(|s| s.to_string()).collect(),
            path_conflicts: PathConflicts::LastWriteWins,
            max_ref_depth: 32,
            max_definition_depth: 64,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl CompilerConfig {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(source: &str) -> Result<Self, ParseError> {
        from_str_with_path(source)
    }

    pub fn is_builtin_type(&self, name: &str) -> bool {
        self.builtin_types.iter().any(|t| t == name)
    }
}
