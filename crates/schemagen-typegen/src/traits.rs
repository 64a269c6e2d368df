//! Traits for output plugins.

use crate::model::ModelSet;
use crate::output::{FormError, SchemaError};

/// Errors raised by an output plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("plugin `{plugin}` failed: {message}")]
    Failed { plugin: String, message: String },
}

/// An output generator.
///
/// Plugins turn a built [`ModelSet`] into one text artifact. The root names
/// the main model; plugins that render every model may ignore it.
///
/// # Implementing Custom Plugins
///
/// ```ignore
/// use schemagen_typegen::{ModelSet, OutputPlugin, PluginError, PluginRegistry};
///
/// struct NamesPlugin;
///
/// impl OutputPlugin for NamesPlugin {
///     fn name(&self) -> &'static str { "names" }
///     fn description(&self) -> &'static str { "One model name per line" }
///     fn extension(&self) -> &'static str { "txt" }
///     fn generate(&self, models: &ModelSet<'_>, _root: &str) -> Result<String, PluginError> {
///         Ok(models.names().join("\n"))
///     }
/// }
///
/// let mut registry = PluginRegistry::with_builtins();
/// registry.register(Box::new(NamesPlugin))?;
/// ```
pub trait OutputPlugin: Send + Sync {
    /// Unique plugin identifier (e.g. "json_schema", "typescript").
    fn name(&self) -> &'static str;

    /// One-line summary shown by `--list-plugins`.
    fn description(&self) -> &'static str;

    /// File extension of the generated artifact (e.g. "ts", "py").
    fn extension(&self) -> &'static str;

    /// Generate the artifact.
    fn generate(&self, models: &ModelSet<'_>, root: &str) -> Result<String, PluginError>;
}
