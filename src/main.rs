//! Trait Composer CLI
//!
//! Renders a component's traits against a workload manifest and prints the
//! mutated workload followed by the auxiliary objects.
//!
//! ```text
//! trait-composer render --component api.yaml --workload deployment.yaml
//! trait-composer schema
//! trait-composer processors
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trait_composer::{
    Component, EngineConfig, EngineMetrics, Error, ProcessorRegistry, Result, TraitEngine,
    TraitKind, Traits, Workload,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Trait Composer - turn component traits into Kubernetes workload changes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a component's traits to a workload manifest
    Render {
        /// Component definition (YAML or JSON)
        #[arg(long)]
        component: PathBuf,

        /// Workload manifest: Deployment, StatefulSet or DaemonSet
        #[arg(long)]
        workload: PathBuf,

        /// Engine configuration file
        #[arg(long, env = "TRAIT_COMPOSER_CONFIG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        /// Print engine metrics to stderr after rendering
        #[arg(long)]
        print_metrics: bool,
    },

    /// Print the JSON schema of the trait payload
    Schema,

    /// List the built-in processors in execution order
    Processors {
        /// Only list processors for this trait kind (e.g. `env`, `probe`)
        #[arg(long)]
        kind: Option<TraitKind>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Yaml,
    Json,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);
    debug!(version = trait_composer::VERSION, "starting {}", trait_composer::NAME);

    match args.command {
        Command::Render {
            component,
            workload,
            config,
            output,
            print_metrics,
        } => render(&component, &workload, config.as_deref(), output, print_metrics),
        Command::Schema => {
            let schema = schemars::schema_for!(Traits);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Processors { kind } => {
            for line in processor_lines(&ProcessorRegistry::builtin()?, kind) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

// =============================================================================
// Render
// =============================================================================

fn render(
    component_path: &Path,
    workload_path: &Path,
    config_path: Option<&Path>,
    output: OutputFormat,
    print_metrics: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };

    let component: Component = serde_yaml::from_str(&read(component_path)?)?;
    let manifest: serde_json::Value = serde_yaml::from_str(&read(workload_path)?)?;
    let mut workload = Workload::try_from(manifest)?;

    let metrics = Arc::new(EngineMetrics::new()?);
    let engine =
        TraitEngine::new(ProcessorRegistry::builtin()?, config).with_metrics(metrics.clone());

    let objects = engine.apply_traits(&component, &mut workload)?;
    info!(
        component = %component.name,
        workload = %workload.name(),
        objects = objects.len(),
        "rendered"
    );

    let mut documents = vec![workload.to_value()?];
    for object in &objects {
        documents.push(object.to_value()?);
    }
    print!("{}", format_documents(&documents, output)?);

    if print_metrics {
        eprint!("{}", metrics.gather_text()?);
    }
    Ok(())
}

/// Numbered processor names, keeping execution positions when filtered
fn processor_lines(registry: &ProcessorRegistry, kind: Option<TraitKind>) -> Vec<String> {
    registry
        .iter()
        .enumerate()
        .filter(|(_, processor)| kind.map_or(true, |kind| processor.kind() == kind))
        .map(|(position, processor)| format!("{:>2}. {}", position + 1, processor.name()))
        .collect()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("failed to read {}: {}", path.display(), e))
    })
}

/// A multi-document YAML stream, or one pretty-printed JSON array
fn format_documents(documents: &[serde_json::Value], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(documents)?)),
        OutputFormat::Yaml => {
            let mut out = String::new();
            for document in documents {
                out.push_str("---\n");
                out.push_str(&serde_yaml::to_string(document)?);
            }
            Ok(out)
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the rendered manifests
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_documents() {
        let documents = vec![json!({ "kind": "Deployment" }), json!({ "kind": "Role" })];

        let yaml = format_documents(&documents, OutputFormat::Yaml).unwrap();
        assert_eq!(yaml.matches("---\n").count(), 2);
        assert!(yaml.contains("kind: Role"));

        let json = format_documents(&documents, OutputFormat::Json).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_render_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let component = dir.path().join("component.yaml");
        let workload = dir.path().join("workload.yaml");
        std::fs::write(
            &component,
            "name: api\nnamespace: demo\nimage: nginx:latest\ntraits:\n  rbac:\n    - rules:\n        - resources: [pods]\n          verbs: [get]\n",
        )
        .unwrap();
        std::fs::write(
            &workload,
            serde_yaml::to_string(&json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": "api" },
                "spec": {
                    "selector": { "matchLabels": { "app": "api" } },
                    "template": { "spec": { "containers": [{ "name": "api" }] } }
                }
            }))
            .unwrap(),
        )
        .unwrap();

        render(&component, &workload, None, OutputFormat::Json, false).unwrap();
    }

    #[test]
    fn test_processors_filtered_by_kind_alias() {
        let args =
            Args::try_parse_from(["trait-composer", "processors", "--kind", "Probe"]).unwrap();
        let Command::Processors { kind } = args.command else {
            panic!("expected the processors command");
        };
        assert_eq!(kind, Some(TraitKind::Probes));

        let registry = ProcessorRegistry::builtin().unwrap();
        assert_eq!(processor_lines(&registry, kind), vec![" 6. probes"]);
        assert_eq!(processor_lines(&registry, None).len(), 10);

        assert!(Args::try_parse_from(["trait-composer", "processors", "--kind", "volume-mounts"])
            .is_err());
    }

    #[test]
    fn test_cli_parses_render() {
        let args = Args::try_parse_from([
            "trait-composer",
            "render",
            "--component",
            "c.yaml",
            "--workload",
            "w.yaml",
            "--output",
            "json",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Render { output: OutputFormat::Json, .. }
        ));
    }
}
