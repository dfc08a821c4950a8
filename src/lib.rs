//! Compile shorthand JSON documents into fully expanded, checked documents.
//!
//! Authors write dotted-path keys (`"properties.id.type": "string"`), bare type
//! names, `$ref` fragments, `@namespace:` keys and named `definitions`.
//! [`compile`] expands all of it into plain JSON:
//!
//! ```text
//! document -> path::expand -> namespace::normalize -> resolve::resolve
//!          -> schema::expand -> definitions::{register, merge} -> checks
//! ```

pub mod check;
pub mod compiler;
pub mod config;
pub mod context;
pub mod definitions;
pub mod error;
pub mod jq_check;
pub mod loader;
pub mod namespace;
pub mod path;
pub mod path_de;
pub mod plugin;
pub mod resolve;
pub mod schema;
pub mod value;

pub use check::{Check, FnCheck, StructureCheck};
pub use compiler::{compile, Stage};
pub use config::CompilerConfig;
pub use context::Context;
pub use error::{CompileError, ErrorKind, ValidationError};
pub use jq_check::JqCheck;
pub use loader::{FileSystemLoader, LoadError, Loader, MemoryLoader};
pub use plugin::{CompositePlugin, Generator, JsonGenerator, Plugin};
pub use value::Value;
