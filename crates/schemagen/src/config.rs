//! Configuration for schemagen.
//!
//! Loads config from:
//! 1. Global: ~/.config/schemagen/config.toml
//! 2. Per-project: the nearest `schemagen.toml` or `.schemagen.toml`, searched
//!    from the working directory upwards (overrides global)
//!
//! Example schemagen.toml:
//! ```toml
//! [output]
//! dir = "generated"
//! mode = "unified"
//! plugins = ["typescript", "pydantic"]
//!
//! [ui]
//! framework = "react"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE_NAMES: [&str; 2] = ["schemagen.toml", ".schemagen.toml"];
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown output mode `{0}` (expected `unified` or `individual`)")]
    UnknownMode(String),
    #[error("unsupported UI framework `{0}` (supported: react)")]
    UnknownFramework(String),
}

/// How schemas are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One `schema.json` with `$defs`, plus `summary.json`.
    #[default]
    Unified,
    /// One `<Name>.schema.json` per model, plus `index.json`.
    Individual,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unified" => Ok(OutputMode::Unified),
            "individual" => Ok(OutputMode::Individual),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framework {
    #[default]
    React,
}

impl FromStr for Framework {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "react" => Ok(Framework::React),
            _ => Err(ConfigError::UnknownFramework(s.to_string())),
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::React => f.write_str("react"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory artifacts are written to.
    pub dir: Option<PathBuf>,
    /// `unified` or `individual`.
    pub mode: Option<String>,
    /// Extra plugins to run after the schemas and form.
    pub plugins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UiConfig {
    pub framework: Option<String>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SchemagenConfig {
    pub output: OutputConfig,
    pub ui: UiConfig,
}

impl SchemagenConfig {
    /// Load the global config, then the nearest project config above `start`.
    pub fn load(start: &Path) -> Result<Self, ConfigError> {
        Self::load_with_global(Self::global_config_path().as_deref(), start)
    }

    fn load_with_global(global: Option<&Path>, start: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = global.filter(|p| p.is_file()) {
            tracing::debug!(path = %path.display(), "loading global config");
            config = config.merge(Self::load_file(path)?);
        }

        if let Some(path) = Self::discover(start) {
            tracing::debug!(path = %path.display(), "loading project config");
            config = config.merge(Self::load_file(&path)?);
        }

        Ok(config)
    }

    /// The nearest config file in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("schemagen").join("config.toml"))
    }

    /// Load config from a file path.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Values set in `other` win.
    fn merge(self, other: Self) -> Self {
        Self {
            output: OutputConfig {
                dir: other.output.dir.or(self.output.dir),
                mode: other.output.mode.or(self.output.mode),
                plugins: other.output.plugins.or(self.output.plugins),
            },
            ui: UiConfig {
                framework: other.ui.framework.or(self.ui.framework),
            },
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn mode(&self) -> Result<OutputMode, ConfigError> {
        self.output
            .mode
            .as_deref()
            .map_or(Ok(OutputMode::default()), |s| s.parse())
    }

    pub fn framework(&self) -> Result<Framework, ConfigError> {
        self.ui
            .framework
            .as_deref()
            .map_or(Ok(Framework::default()), |s| s.parse())
    }

    pub fn plugins(&self) -> &[String] {
        self.output.plugins.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{content}").unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = SchemagenConfig::default();
        assert_eq!(config.mode().unwrap(), OutputMode::Unified);
        assert_eq!(config.framework().unwrap(), Framework::React);
        assert_eq!(config.output_dir(), PathBuf::from("generated"));
        assert!(config.plugins().is_empty());
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("schemagen.toml"),
            r#"
[output]
mode = "individual"
plugins = ["typescript"]
"#,
        );
        let nested = dir.path().join("schemas").join("v1");
        std::fs::create_dir_all(&nested).unwrap();

        let config = SchemagenConfig::load_with_global(None, &nested).unwrap();
        assert_eq!(config.mode().unwrap(), OutputMode::Individual);
        assert_eq!(config.plugins(), ["typescript".to_string()]);
        assert_eq!(config.output_dir(), PathBuf::from("generated"));
    }

    #[test]
    fn test_hidden_config_name() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join(".schemagen.toml"), "[output]\ndir = \"out\"");

        let found = SchemagenConfig::discover(dir.path()).unwrap();
        assert!(found.ends_with(".schemagen.toml"));
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        write(
            &global,
            r#"
[output]
dir = "global-out"
mode = "individual"
"#,
        );
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        write(&project.join("schemagen.toml"), "[output]\ndir = \"local-out\"");

        let config = SchemagenConfig::load_with_global(Some(&global), &project).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("local-out"));
        // Not set by the project, so the global value stays.
        assert_eq!(config.mode().unwrap(), OutputMode::Individual);
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemagen.toml");
        write(&path, "[output]\nmode = \"split\"\n\n[ui]\nframework = \"angular\"");

        let config = SchemagenConfig::load_file(&path).unwrap();
        assert!(matches!(config.mode(), Err(ConfigError::UnknownMode(_))));
        assert!(matches!(
            config.framework(),
            Err(ConfigError::UnknownFramework(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemagen.toml");
        write(&path, "[output\n");
        assert!(matches!(
            SchemagenConfig::load_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
