//! The compilation pipeline.
//!
//! ```text
//! Expanding -> Namespacing -> Resolving -> SchemaExpanding
//!   -> Registering -> Merging -> Checking -> Output -> Done
//! ```
//!
//! Each stage is a plain function over an owned [`Value`] and is public on its
//! own. [`compile`] runs them in order; the first failure stops the pipeline
//! and comes back as a [`CompileError`] carrying the stage and the context
//! in effect at that point.

use std::fmt;

use crate::check::{self, StructureCheck};
use crate::context::Context;
use crate::definitions;
use crate::error::{CompileError, ErrorKind, StageResult};
use crate::namespace;
use crate::path;
use crate::plugin::Plugin;
use crate::resolve;
use crate::schema;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Plugin `configure` hooks, run by callers before compiling
    Configuring,
    Expanding,
    Namespacing,
    Resolving,
    SchemaExpanding,
    Registering,
    Merging,
    Checking,
    /// Plugin `before_output` hooks
    Output,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Configuring => "configuring",
            Stage::Expanding => "expanding",
            Stage::Namespacing => "namespacing",
            Stage::Resolving => "resolving",
            Stage::SchemaExpanding => "schema-expanding",
            Stage::Registering => "registering",
            Stage::Merging => "merging",
            Stage::Checking => "checking",
            Stage::Output => "output",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---- Stages ---- //

pub fn path_expansion(ctx: &Context, document: Value) -> StageResult<Value> {
    path::expand_configured(document, &ctx.config)
}

pub fn namespace_substitution(ctx: &Context, document: Value) -> Value {
    namespace::normalize_configured(&ctx.namespaces, &ctx.config, document)
}

pub async fn fragment_resolution(ctx: &Context, document: Value) -> StageResult<Value> {
    resolve::resolve(ctx, document).await
}

pub fn schema_expansion(document: Value) -> Value {
    schema::expand(document)
}

pub fn definition_registration(ctx: Context, document: &Value) -> Context {
    definitions::register(ctx, document)
}

pub fn definition_merging(ctx: &Context, document: Value) -> StageResult<Value> {
    definitions::merge(document, ctx)
}

/// Baseline structure check, caller checks, then plugin checks.
pub async fn check_stage(ctx: &Context, document: Value) -> StageResult<Value> {
    let baseline = StructureCheck::new(ctx.config.ref_key.clone());
    let checks = ctx.all_checks();
    Ok(check::run_checks(&baseline, &checks, document).await?)
}

pub async fn output_stage(ctx: &Context, document: Value) -> StageResult<Value> {
    ctx.plugins.before_output(document).await
}

// ---- Pipeline ---- //

fn fail(stage: Stage, ctx: &Context) -> impl FnOnce(ErrorKind) -> CompileError + '_ {
    move |kind| {
        tracing::warn!(%stage, error = %kind, "compilation failed");
        CompileError::new(stage, kind, ctx)
    }
}

/// Compile `document` under `ctx`.
pub async fn compile(ctx: Context, document: Value) -> Result<Value, CompileError> {
    tracing::debug!(stage = %Stage::Expanding);
    let document = path_expansion(&ctx, document).map_err(fail(Stage::Expanding, &ctx))?;

    tracing::debug!(stage = %Stage::Namespacing, namespaces = ?ctx.namespaces);
    let document = namespace_substitution(&ctx, document);

    tracing::debug!(stage = %Stage::Resolving);
    let document = fragment_resolution(&ctx, document)
        .await
        .map_err(fail(Stage::Resolving, &ctx))?;

    tracing::debug!(stage = %Stage::SchemaExpanding);
    let document = schema_expansion(document);

    tracing::debug!(stage = %Stage::Registering);
    let ctx = definition_registration(ctx, &document);

    tracing::debug!(stage = %Stage::Merging, definitions = ctx.definitions.len());
    let document = definition_merging(&ctx, document).map_err(fail(Stage::Merging, &ctx))?;

    tracing::debug!(stage = %Stage::Checking);
    let document = check_stage(&ctx, document)
        .await
        .map_err(fail(Stage::Checking, &ctx))?;

    tracing::debug!(stage = %Stage::Output, plugins = ctx.plugins.len());
    let document = output_stage(&ctx, document)
        .await
        .map_err(fail(Stage::Output, &ctx))?;

    tracing::debug!(stage = %Stage::Done);
    Ok(document)
}

// ------------------------------- Tests ------------------------------------ //
