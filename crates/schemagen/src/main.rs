//! schemagen: turn a compiled type table into JSON Schema, a form descriptor
//! and typed models.

mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use config::{Framework, OutputMode, SchemagenConfig};
use schemagen_typegen::output::{self, SchemaSummary};
use schemagen_typegen::{BuildReport, ModelSet, PluginRegistry, input, model, resolve};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "schemagen", version, about)]
struct Cli {
    /// Type table (JSON) produced by the schema compiler
    #[arg(required_unless_present = "list_plugins")]
    table: Option<PathBuf>,

    /// Name of the main model
    #[arg(short, long, required_unless_present = "list_plugins")]
    root: Option<String>,

    /// Write one schema per model instead of a unified document
    #[arg(long)]
    individual: bool,

    /// Output directory (default: `generated`)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// UI framework for the form output
    #[arg(long)]
    framework: Option<String>,

    /// Extra output plugin to run (repeatable)
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,

    /// Config file (default: nearest schemagen.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List available output plugins and exit
    #[arg(long)]
    list_plugins: bool,

    /// Fail if any model fails to build
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let plugins = PluginRegistry::with_builtins();
    if cli.list_plugins {
        for (name, description) in plugins.list() {
            println!("{name:<14} {description}");
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => SchemagenConfig::load_file(path)?,
        None => SchemagenConfig::load(&std::env::current_dir()?)?,
    };
    let settings = Settings::resolve(&cli, &config)?;

    let (Some(table_path), Some(root)) = (&cli.table, &cli.root) else {
        bail!("a type table and --root are required");
    };
    run(table_path, root, &settings, &plugins)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// CLI flags layered over the config file.
#[derive(Debug)]
struct Settings {
    output_dir: PathBuf,
    mode: OutputMode,
    framework: Framework,
    plugins: Vec<String>,
    strict: bool,
}

impl Settings {
    fn resolve(cli: &Cli, config: &SchemagenConfig) -> Result<Self> {
        let mode = if cli.individual {
            OutputMode::Individual
        } else {
            config.mode()?
        };
        let framework = match &cli.framework {
            Some(name) => name.parse()?,
            None => config.framework()?,
        };
        let plugins = if cli.plugins.is_empty() {
            config.plugins().to_vec()
        } else {
            cli.plugins.clone()
        };
        Ok(Self {
            output_dir: cli.output_dir.clone().unwrap_or_else(|| config.output_dir()),
            mode,
            framework,
            plugins,
            strict: cli.strict,
        })
    }
}

fn run(table_path: &Path, root: &str, settings: &Settings, plugins: &PluginRegistry) -> Result<()> {
    let text = std::fs::read_to_string(table_path)
        .with_context(|| format!("failed to read {}", table_path.display()))?;
    let table = input::parse_type_table_str(&text)
        .with_context(|| format!("failed to parse {}", table_path.display()))?;
    let registry = resolve(table)?;

    let report = model::build(&registry);
    let models = if settings.strict {
        report.into_result()?
    } else {
        let BuildReport { models, errors } = report;
        if let Some(error) = errors.iter().find(|e| e.type_name == root) {
            bail!("root type `{root}` failed to build: {}", error.reason);
        }
        if !errors.is_empty() {
            tracing::warn!(
                failed = errors.len(),
                "some models failed to build; continuing with the rest"
            );
        }
        models
    };

    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("failed to create {}", settings.output_dir.display()))?;
    remove_stale_outputs(&settings.output_dir)?;

    write_schemas(&models, root, settings)?;

    tracing::info!(framework = %settings.framework, "generating form descriptor");
    let form = output::generate_form(&models, root)?;
    write_file(
        &settings.output_dir.join("form.json"),
        &serde_json::to_string_pretty(&form)?,
    )?;

    for name in &settings.plugins {
        let Some(plugin) = plugins.get(name) else {
            bail!(
                "unknown plugin `{name}` (available: {})",
                plugins.names().join(", ")
            );
        };
        let source = plugin
            .generate(&models, root)
            .with_context(|| format!("plugin `{name}` failed"))?;
        write_file(
            &settings
                .output_dir
                .join(format!("{root}.{}", plugin.extension())),
            &source,
        )?;
    }

    Ok(())
}

fn write_schemas(models: &ModelSet<'_>, root: &str, settings: &Settings) -> Result<()> {
    let dir = &settings.output_dir;
    match settings.mode {
        OutputMode::Unified => {
            let document = output::emit_unified(models, root)?;
            let summary = SchemaSummary::new(models, root, &document);
            write_file(
                &dir.join(&summary.schema_file),
                &serde_json::to_string_pretty(&document)?,
            )?;
            write_file(
                &dir.join("summary.json"),
                &serde_json::to_string_pretty(&summary)?,
            )?;
            tracing::info!(
                root,
                nested = summary.nested_types.len(),
                "wrote unified schema"
            );
        }
        OutputMode::Individual => {
            let schemas = output::emit_individual(models);
            for (name, document) in &schemas.documents {
                write_file(
                    &dir.join(output::schema_file_name(name)),
                    &serde_json::to_string_pretty(document)?,
                )?;
            }
            write_file(
                &dir.join("index.json"),
                &serde_json::to_string_pretty(&schemas.index)?,
            )?;
            tracing::info!(count = schemas.index.total_schemas, "wrote individual schemas");
        }
    }
    Ok(())
}

/// Names of the JSON files a run writes; anything else in the output
/// directory is left alone.
fn is_generated_json(file_name: &str) -> bool {
    matches!(
        file_name,
        "schema.json" | "summary.json" | "index.json" | "form.json"
    ) || file_name.ends_with(".schema.json")
}

/// Remove JSON artifacts left in `dir` by a previous run.
fn remove_stale_outputs(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        let generated = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_generated_json);
        if generated && path.is_file() {
            tracing::debug!(path = %path.display(), "removing stale output");
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = r#"[
        { "name": "Order", "record": [
            { "name": "id", "type": "string" },
            { "name": "items", "type": { "list": { "ref": "Item" } } }
        ]},
        { "name": "Item", "record": [{ "name": "sku", "type": "string" }] }
    ]"#;

    fn settings(dir: &Path, mode: OutputMode, plugins: &[&str]) -> Settings {
        Settings {
            output_dir: dir.to_path_buf(),
            mode,
            framework: Framework::React,
            plugins: plugins.iter().map(|p| p.to_string()).collect(),
            strict: true,
        }
    }

    fn table_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("table.json");
        std::fs::write(&path, TABLE).unwrap();
        path
    }

    #[test]
    fn test_unified_run_writes_artifacts() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("Old.schema.json"), "{}").unwrap();
        std::fs::write(out.path().join("notes.txt"), "keep").unwrap();

        run(
            &table_file(&input),
            "Order",
            &settings(out.path(), OutputMode::Unified, &["typescript"]),
            &PluginRegistry::with_builtins(),
        )
        .unwrap();

        assert!(out.path().join("schema.json").is_file());
        assert!(out.path().join("summary.json").is_file());
        assert!(out.path().join("form.json").is_file());
        assert!(out.path().join("Order.ts").is_file());
        assert!(out.path().join("notes.txt").is_file());
        assert!(!out.path().join("Old.schema.json").exists());

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["main_model"], "Order");
        assert_eq!(summary["nested_types"], serde_json::json!(["Item"]));
    }

    #[test]
    fn test_table_in_output_dir_survives() {
        let dir = TempDir::new().unwrap();
        let table = table_file(&dir);
        std::fs::write(dir.path().join("Stale.schema.json"), "{}").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        run(
            &table,
            "Order",
            &settings(dir.path(), OutputMode::Unified, &[]),
            &PluginRegistry::with_builtins(),
        )
        .unwrap();

        assert!(table.is_file());
        assert!(dir.path().join("package.json").is_file());
        assert!(!dir.path().join("Stale.schema.json").exists());
        assert!(dir.path().join("schema.json").is_file());
    }

    #[test]
    fn test_generated_json_names() {
        assert!(is_generated_json("Order.schema.json"));
        assert!(is_generated_json("summary.json"));
        assert!(is_generated_json("form.json"));
        assert!(!is_generated_json("table.json"));
        assert!(!is_generated_json("tsconfig.json"));
    }

    #[test]
    fn test_failed_root_names_build_error() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("table.json");
        std::fs::write(
            &table,
            r#"[{ "name": "Flag", "record": [
                { "name": "on", "type": "boolean", "default": { "literal": "yes" } }
            ]}]"#,
        )
        .unwrap();
        let mut lenient = settings(dir.path(), OutputMode::Unified, &[]);
        lenient.strict = false;

        let err = run(&table, "Flag", &lenient, &PluginRegistry::with_builtins()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("root type `Flag` failed to build"));
        assert!(!message.contains("not found"));
    }

    #[test]
    fn test_individual_run_writes_index() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        run(
            &table_file(&input),
            "Order",
            &settings(out.path(), OutputMode::Individual, &[]),
            &PluginRegistry::with_builtins(),
        )
        .unwrap();

        assert!(out.path().join("Order.schema.json").is_file());
        assert!(out.path().join("Item.schema.json").is_file());
        assert!(out.path().join("index.json").is_file());
        assert!(!out.path().join("schema.json").exists());
    }

    #[test]
    fn test_unknown_plugin_fails() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let err = run(
            &table_file(&input),
            "Order",
            &settings(out.path(), OutputMode::Unified, &["kotlin"]),
            &PluginRegistry::with_builtins(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown plugin `kotlin`"));
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "schemagen",
            "table.json",
            "--root",
            "Order",
            "--individual",
            "--plugin",
            "pydantic",
        ]);
        let config: SchemagenConfig =
            toml::from_str("[output]\nmode = \"unified\"\nplugins = [\"typescript\"]\ndir = \"x\"")
                .unwrap();
        let settings = Settings::resolve(&cli, &config).unwrap();

        assert_eq!(settings.mode, OutputMode::Individual);
        assert_eq!(settings.plugins, vec!["pydantic"]);
        assert_eq!(settings.output_dir, PathBuf::from("x"));
    }

    #[test]
    fn test_unsupported_framework_flag() {
        let cli = Cli::parse_from(["schemagen", "t.json", "-r", "A", "--framework", "vue"]);
        assert!(Settings::resolve(&cli, &SchemagenConfig::default()).is_err());
    }
}
