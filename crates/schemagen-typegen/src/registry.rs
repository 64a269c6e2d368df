//! Registry of output plugins.
//!
//! The registry is a plain value owned by the caller; nothing is global.

use crate::traits::OutputPlugin;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(String),
}

/// Name-keyed plugins in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn OutputPlugin>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut plugins: Vec<Box<dyn OutputPlugin>> = vec![
            Box::new(crate::output::JsonSchemaPlugin),
            Box::new(crate::output::FormPlugin),
            Box::new(crate::output::TypeScriptPlugin),
        ];

        #[cfg(feature = "backend-pydantic")]
        {
            plugins.push(Box::new(crate::output::PydanticPlugin));
        }

        Self { plugins }
    }

    /// Add a plugin; names must be unique.
    pub fn register(&mut self, plugin: Box<dyn OutputPlugin>) -> Result<(), RegistryError> {
        if self.get(plugin.name()).is_some() {
            return Err(RegistryError::DuplicatePlugin(plugin.name().to_string()));
        }
        tracing::debug!(plugin = plugin.name(), "registered output plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn OutputPlugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// `(name, description)` pairs in registration order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.plugins
            .iter()
            .map(|p| (p.name(), p.description()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSet;
    use crate::traits::PluginError;

    struct Echo;

    impl OutputPlugin for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echoes the root name"
        }

        fn extension(&self) -> &'static str {
            "txt"
        }

        fn generate(&self, _models: &ModelSet<'_>, root: &str) -> Result<String, PluginError> {
            Ok(root.to_string())
        }
    }

    #[test]
    fn builtins_are_listed_in_order() {
        let registry = PluginRegistry::with_builtins();
        let names = registry.names();
        assert_eq!(&names[..3], &["json_schema", "form", "typescript"]);
        #[cfg(feature = "backend-pydantic")]
        assert_eq!(names[3], "pydantic");
    }

    #[test]
    fn register_and_get() {
        let mut registry = PluginRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(Echo)).unwrap();

        let plugin = registry.get("echo").unwrap();
        assert_eq!(plugin.extension(), "txt");
        assert_eq!(registry.list(), vec![("echo", "Echoes the root name")]);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(Echo)).unwrap();
        assert_eq!(
            registry.register(Box::new(Echo)),
            Err(RegistryError::DuplicatePlugin("echo".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builtin_names_cannot_be_reused() {
        let mut registry = PluginRegistry::with_builtins();
        let err = registry
            .register(Box::new(crate::output::FormPlugin))
            .unwrap_err();
        assert_eq!(err.to_string(), "plugin `form` is already registered");
    }
}
