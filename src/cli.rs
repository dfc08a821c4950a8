//! Minimal CLI: shorthand document → compiled JSON
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use dagen::path_de::from_str_with_path;
use dagen::plugin::{Conf, Plugin};
use dagen::value::Object;
use dagen::{
    compile, path, Check, CompileError, CompilerConfig, Context, FileSystemLoader, Generator,
    JqCheck, JsonGenerator, Value,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile shorthand JSON schema documents into fully expanded JSON
#[derive(Parser, Debug)]
#[command(name = "dagen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a document and print the expanded result
    Compile(CompileOut),
}

#[derive(Args, Debug, Clone)]
struct ContextSettings {
    /// namespace whose `@namespace:` keys apply; repeat for several, later ones win
    #[arg(long, short, value_parser = parse_namespace)]
    namespace: Vec<String>,

    /// definition files; literal paths or quoted glob patterns
    #[arg(long, short)]
    definition: Vec<String>,

    /// jq expression that must yield `true` for the compiled document
    #[arg(long)]
    check: Vec<String>,

    /// compiler settings (.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// override a value before compiling, e.g. `--set title='"Person"'`
    ///
    /// The value is parsed as JSON and falls back to a plain string.
    /// `PATH=require://FILE` reads the value from a JSON file instead.
    #[arg(long, value_parser = parse_assignment)]
    set: Vec<(String, Value)>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    /// the document to compile; `$ref`s resolve relative to its directory
    file: PathBuf,

    #[command(flatten)]
    context_settings: ContextSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// single-line output
    #[arg(long)]
    compact: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ContextSettings {
    fn load_config(&self) -> Result<CompilerConfig> {
        match self.config.as_ref() {
            Some(path) => Ok(CompilerConfig::load(path)?),
            None => Ok(CompilerConfig::default()),
        }
    }

    /// Definitions from every `--definition` file; the first file naming a
    /// definition wins.
    fn load_definitions(&self, config: &CompilerConfig) -> Result<Object> {
        let mut definitions = Object::new();
        for source_path in resolve_file_path_patterns(&self.definition)? {
            let source_path_str = source_path.display().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read definition file {source_path_str}"))?;
            let value: Value = from_str_with_path(&source)
                .with_context(|| format!("failed to parse definition file {source_path_str}"))?;
            let value = path::expand_configured(value, config)
                .with_context(|| format!("failed to expand definition file {source_path_str}"))?;
            let Value::Object(map) = value else {
                bail!("definition file {source_path_str} must contain an object of named definitions");
            };
            tracing::debug!(file = %source_path_str, count = map.len(), "loaded definitions");
            for (name, definition) in map {
                if !definitions.contains_key(&name) {
                    definitions.insert(name, definition);
                }
            }
        }
        Ok(definitions)
    }

    fn build_context(&self, file: &Path) -> Result<Context> {
        let config = self.load_config()?;
        let definitions = self.load_definitions(&config)?;
        let checks = self
            .check
            .iter()
            .map(|expr| Arc::new(JqCheck::new(expr)) as Arc<dyn Check>)
            .collect();
        let base = file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Ok(Context::new(Arc::new(FileSystemLoader::new(base)))
            .with_definitions(definitions)
            .with_namespaces(self.namespace.iter().cloned())
            .with_checks(checks)
            .with_config(config))
    }

    fn apply_overrides(&self, document: Value, separator: char) -> Value {
        self.set.iter().fold(document, |document, (key, value)| {
            path::set(document, key, value.clone(), separator)
        })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub async fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Compile(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                target.run().await
            }
        }
    }
}

impl CompileOut {
    async fn run(&self) -> Result<()> {
        let settings = &self.context_settings;
        let ctx = settings.build_context(&self.file)?;

        let source = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let document: Value = from_str_with_path(&source)
            .with_context(|| format!("failed to parse {}", self.file.display()))?;
        let document = settings.apply_overrides(document, ctx.config.path_separator);

        let conf = ctx.configure_plugins(Conf::new()).await?;
        tracing::debug!(plugins = ?conf.keys().collect::<Vec<_>>(), "plugins configured");

        let generator: Box<dyn Generator> = Box::new(JsonGenerator { compact: self.compact });
        let generator = ctx
            .plugins
            .configure_generator(generator)
            .await
            .context("failed to configure the output generator")?;

        let compiled = match compile(ctx, document).await {
            Ok(compiled) => compiled,
            Err(error) => {
                report(&self.file, &error);
                bail!("compilation of {} failed", self.file.display());
            }
        };
        let rendered = generator.render(&compiled)?;

        if let Some(out) = self.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, &rendered).with_context(|| format!("failed to write {}", out.display()))?;
        } else {
            println!("{rendered}");
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(file: &Path, error: &CompileError) {
    eprintln!(
        "{} {} {}",
        format!("[{}]", error.kind().tag()).red().bold(),
        file.display().to_string().bold(),
        format!("({} stage)", error.stage).dimmed(),
    );
    eprintln!("  {}", error.message());
    let namespaces = &error.snapshot.namespaces;
    if !namespaces.is_empty() {
        eprintln!("  {} {}", "namespaces:".dimmed(), namespaces.join(", "));
    }
    let definitions = error.snapshot.definition_names();
    if !definitions.is_empty() {
        eprintln!("  {} {}", "definitions in scope:".dimmed(), definitions.join(", "));
    }
}

fn parse_namespace(raw: &str) -> Result<String, String> {
    if dagen::namespace::is_valid_namespace(raw) {
        Ok(raw.to_string())
    } else {
        Err(format!("`{raw}` is not a valid namespace name"))
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected PATH=VALUE, got `{raw}`"));
    };
    if key.is_empty() {
        return Err("the path of an assignment cannot be empty".to_string());
    }
    if let Some(file) = value.strip_prefix(REQUIRE_PREFIX) {
        return Ok((key.to_string(), require_file(file)?));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

const REQUIRE_PREFIX: &str = "require://";

fn require_file(file: &str) -> Result<Value, String> {
    let source = std::fs::read_to_string(file).map_err(|error| format!("failed to read {file}: {error}"))?;
    from_str_with_path(&source).map_err(|error| format!("failed to parse {file}: {error}"))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
            if matched.is_empty() {
                bail!("glob pattern matched no files: {pattern}");
            }
            matched.sort();
            out.extend(matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
