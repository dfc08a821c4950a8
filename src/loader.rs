//! Fragment loaders.
//!
//! The resolver only knows the [`Loader`] contract: turn a reference string
//! into a value. Where fragments live is the loader's business.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::path_de::{from_slice_with_path, ParseError};
use crate::value::Value;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("fragment `{0}` not found")]
    NotFound(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

#[async_trait]
pub trait Loader: Send + Sync {
    /// Fetch the fragment named by `reference`.
    async fn load(&self, reference: &str) -> Result<Value, LoadError>;

    /// Canonical identity of `reference`, used to spot reference cycles.
    ///
    /// Two spellings of the same fragment should map to the same key.
    fn key(&self, reference: &str) -> String {
        reference.to_string()
    }
}

// ------------------------------ File system ------------------------------- //

/// Loads JSON fragments relative to a base directory fixed at construction.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    base: PathBuf,
}

impl FileSystemLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn locate(&self, reference: &str) -> PathBuf {
        normalize_lexically(&self.base.join(reference))
    }
}

#[async_trait]
impl Loader for FileSystemLoader {
    async fn load(&self, reference: &str) -> Result<Value, LoadError> {
        let path = self.locate(reference);
        tracing::trace!(path = %path.display(), "reading fragment");
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.display().to_string()));
            }
            Err(source) => return Err(LoadError::Io { path, source }),
        };
        from_slice_with_path(&bytes).map_err(|source| LoadError::Parse { path, source })
    }

    fn key(&self, reference: &str) -> String {
        self.locate(reference).to_string_lossy().into_owned()
    }
}

/// Resolve `.` and `..` without touching the file system.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_))) && out.pop();
                if !popped {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

// -------------------------------- Memory ---------------------------------- //

/// Fragments held in memory, keyed by their exact reference string.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    fragments: IndexMap<String, Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: impl Into<String>, fragment: Value) -> Self {
        self.insert(reference, fragment);
        self
    }

    pub fn insert(&mut self, reference: impl Into<String>, fragment: Value) {
        self.fragments.insert(reference.into(), fragment);
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for MemoryLoader {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fragments: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    async fn load(&self, reference: &str) -> Result<Value, LoadError> {
        self.fragments
            .get(reference)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(reference.to_string()))
    }
}
