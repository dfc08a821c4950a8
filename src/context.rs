//! The compilation context.
//!
//! A [`Context`] is built once per compilation from caller-supplied pieces and
//! threaded through the pipeline by value. Adding definitions produces a new
//! context; nothing is shared mutably between stages or between concurrent
//! compilations.

use std::sync::Arc;

use crate::check::Check;
use crate::config::CompilerConfig;
use crate::error::{CompileError, ContextSnapshot};
use crate::compiler::Stage;
use crate::loader::{Loader, MemoryLoader};
use crate::plugin::{CompositePlugin, Conf, Plugin};
use crate::schema;
use crate::value::Object;

#[derive(Clone)]
pub struct Context {
    /// Named schemas known so far
    pub definitions: Object,
    /// Namespaces whose `@ns:` keys apply
    pub namespaces: Vec<String>,
    /// Caller checks, run after the baseline structure check
    pub checks: Vec<Arc<dyn Check>>,
    pub loader: Arc<dyn Loader>,
    pub plugins: CompositePlugin,
    pub config: CompilerConfig,
}

impl Context {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            definitions: Object::new(),
            namespaces: Vec::new(),
            checks: Vec::new(),
            loader,
            plugins: CompositePlugin::default(),
            config: CompilerConfig::default(),
        }
    }

    /// Replace the known definitions. Bare type names in them are expanded
    /// the same way the document's own schema positions are.
    pub fn with_definitions(mut self, definitions: Object) -> Self {
        self.definitions = definitions
            .into_iter()
            .map(|(name, definition)| (name, schema::expand(definition)))
            .collect();
        self
    }

    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_checks(mut self, checks: Vec<Arc<dyn Check>>) -> Self {
        self.checks.extend(checks);
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// A new context knowing `delta` as well.
    ///
    /// Left-biased: a name this context already defines keeps its current
    /// value and the one in `delta` is ignored.
    pub fn add_definitions(&self, delta: Object) -> Context {
        let mut next = self.clone();
        for (name, definition) in delta {
            if next.definitions.contains_key(&name) {
                tracing::debug!(definition = %name, "keeping existing definition");
                continue;
            }
            next.definitions.insert(name, schema::expand(definition));
        }
        next
    }

    /// Caller checks followed by plugin checks.
    pub fn all_checks(&self) -> Vec<Arc<dyn Check>> {
        let mut checks = self.checks.clone();
        checks.extend(self.plugins.checks());
        checks
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot::of(self)
    }

    /// Run every plugin's `configure` hook over `conf`.
    pub async fn configure_plugins(&self, conf: Conf) -> Result<Conf, CompileError> {
        self.plugins
            .configure(conf)
            .await
            .map_err(|kind| CompileError::new(Stage::Configuring, kind, self))
    }
}

impl Default for Context {
    /// A context whose loader knows no fragments.
    fn default() -> Self {
        Self::new(Arc::new(MemoryLoader::new()))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("namespaces", &self.namespaces)
            .field("checks", &self.checks.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("plugins", &self.plugins)
            .field("config", &self.config)
            .finish()
    }
}
