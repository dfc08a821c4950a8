//! Extension points.
//!
//! A [`Plugin`] can contribute checks, rewrite the compiled document right
//! before it is handed to a generator, and reconfigure that generator. Every
//! hook has a pass-through default. [`CompositePlugin`] folds the hooks of
//! all registered plugins in registration order.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::check::Check;
use crate::error::ErrorKind;
use crate::value::{Object, Value};

/// Plugin settings, keyed by plugin name.
pub type Conf = IndexMap<String, Object>;

/// Turns a compiled document into output text.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, document: &Value) -> anyhow::Result<String>;
}

/// Renders the document as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGenerator {
    pub compact: bool,
}

impl Generator for JsonGenerator {
    fn name(&self) -> &str {
        "json"
    }

    fn render(&self, document: &Value) -> anyhow::Result<String> {
        let text = if self.compact {
            serde_json::to_string(document)?
        } else {
            serde_json::to_string_pretty(document)?
        };
        Ok(text)
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Checks to run after the caller's own.
    fn checks(&self) -> Vec<Arc<dyn Check>> {
        Vec::new()
    }

    async fn configure(&self, conf: Conf) -> Result<Conf, ErrorKind> {
        Ok(conf)
    }

    /// Last look at the checked document.
    async fn before_output(&self, document: Value) -> Result<Value, ErrorKind> {
        Ok(document)
    }

    async fn configure_generator(
        &self,
        generator: Box<dyn Generator>,
    ) -> Result<Box<dyn Generator>, ErrorKind> {
        Ok(generator)
    }
}

#[derive(Clone, Default)]
pub struct CompositePlugin {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl CompositePlugin {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn push(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for CompositePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositePlugin")
            .field("plugins", &self.names())
            .finish()
    }
}

#[async_trait]
impl Plugin for CompositePlugin {
    fn name(&self) -> &str {
        "composite"
    }

    fn checks(&self) -> Vec<Arc<dyn Check>> {
        self.plugins.iter().flat_map(|p| p.checks()).collect()
    }

    async fn configure(&self, conf: Conf) -> Result<Conf, ErrorKind> {
        let mut conf = conf;
        for plugin in &self.plugins {
            conf = plugin.configure(conf).await?;
        }
        Ok(conf)
    }

    async fn before_output(&self, document: Value) -> Result<Value, ErrorKind> {
        let mut document = document;
        for plugin in &self.plugins {
            tracing::debug!(plugin = plugin.name(), "before output");
            document = plugin.before_output(document).await?;
        }
        Ok(document)
    }

    async fn configure_generator(
        &self,
        generator: Box<dyn Generator>,
    ) -> Result<Box<dyn Generator>, ErrorKind> {
        let mut generator = generator;
        for plugin in &self.plugins {
            generator = plugin.configure_generator(generator).await?;
        }
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::FnCheck;
    use serde_json::json;

    struct Stamp(&'static str);

    #[async_trait]
    impl Plugin for Stamp {
        fn name(&self) -> &str {
            self.0
        }

        fn checks(&self) -> Vec<Arc<dyn Check>> {
            let check: Arc<dyn Check> = Arc::new(FnCheck::new(self.0, Ok));
            vec![check]
        }

        async fn configure(&self, mut conf: Conf) -> Result<Conf, ErrorKind> {
            conf.entry(self.0.to_string()).or_default().insert("seen".into(), json!(true));
            Ok(conf)
        }

        async fn before_output(&self, mut document: Value) -> Result<Value, ErrorKind> {
            if let Some(trail) = document["trail"].as_array_mut() {
                trail.push(json!(self.0));
            }
            Ok(document)
        }

        async fn configure_generator(
            &self,
            generator: Box<dyn Generator>,
        ) -> Result<Box<dyn Generator>, ErrorKind> {
            Ok(Box::new(Banner { label: self.0, inner: generator }))
        }
    }

    struct Banner {
        label: &'static str,
        inner: Box<dyn Generator>,
    }

    impl Generator for Banner {
        fn name(&self) -> &str {
            self.label
        }

        fn render(&self, document: &Value) -> anyhow::Result<String> {
            Ok(format!("[{}]{}", self.label, self.inner.render(document)?))
        }
    }

    struct Refuse;

    #[async_trait]
    impl Plugin for Refuse {
        fn name(&self) -> &str {
            "refuse"
        }

        async fn before_output(&self, _document: Value) -> Result<Value, ErrorKind> {
            Err(ErrorKind::plugin("refuse", "not today"))
        }
    }

    fn composite() -> CompositePlugin {
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Stamp("a")), Arc::new(Stamp("b"))];
        CompositePlugin::new(plugins)
    }

    #[tokio::test]
    async fn hooks_fold_in_registration_order() {
        let plugins = composite();
        let out = plugins.before_output(json!({"trail": []})).await.unwrap();
        assert_eq!(out, json!({"trail": ["a", "b"]}));

        let generator = plugins.configure_generator(Box::new(JsonGenerator { compact: true })).await.unwrap();
        assert_eq!(generator.render(&json!({"x": 1})).unwrap(), "[b][a]{\"x\":1}");

        let conf = plugins.configure(Conf::new()).await.unwrap();
        assert_eq!(conf.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[tokio::test]
    async fn composite_collects_checks_and_stops_on_error() {
        let mut plugins = composite();
        assert_eq!(plugins.checks().iter().map(|c| c.name().to_string()).collect::<Vec<_>>(), ["a", "b"]);

        plugins.push(Arc::new(Refuse));
        plugins.push(Arc::new(Stamp("c")));
        let err = plugins.before_output(json!({"trail": []})).await.unwrap_err();
        assert_eq!(err.tag(), "Plugin");
        assert_eq!(plugins.names(), ["a", "b", "refuse", "c"]);
    }

    #[test]
    fn json_generator_pretty_prints_by_default() {
        let text = JsonGenerator::default().render(&json!({"a": 1})).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }
}
