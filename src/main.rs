use anyhow::{Context, Result};
use changewatch::cli::{Cli, Command, OutputFormat};
use changewatch::config::EngineConfig;
use changewatch::descriptor::ConfigDescriptor;
use changewatch::driver::{AnalysisDriver, AnalysisRequest, InMemoryHistory};
use changewatch::registry::ModelRegistry;
use changewatch::types::{Change, DataPoint, Variable, VariableId};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Contents of an `analyze --input` file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisInput {
    variables: Vec<Variable>,
    #[serde(default)]
    data_points: Vec<DataPoint>,
    /// Timestamp of the latest known change, per variable id
    #[serde(default)]
    last_changes: HashMap<VariableId, DateTime<Utc>>,
}

impl AnalysisInput {
    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse input file: {}", path.display()))
    }
}

/// Reject detection configs that do not match their model's descriptor
fn check_detection_configs(registry: &ModelRegistry, variables: &[Variable]) -> Result<()> {
    for variable in variables {
        for detection in &variable.detection {
            let model = registry
                .resolve(&detection.model)
                .with_context(|| format!("Variable {} ({})", variable.id, variable.name))?;
            model
                .descriptor()
                .validate(&detection.config)
                .map_err(|reason| {
                    anyhow::anyhow!(
                        "Variable {} ({}): invalid {} configuration: {}",
                        variable.id,
                        variable.name,
                        detection.model,
                        reason
                    )
                })?;
        }
    }
    Ok(())
}

fn print_models(
    descriptors: &BTreeMap<String, ConfigDescriptor>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(descriptors)?);
        }
        OutputFormat::Text => {
            for (name, descriptor) in descriptors {
                println!("{} - {}", name, descriptor.title);
                println!("    {}", descriptor.description);
                for component in &descriptor.components {
                    println!(
                        "    {:<14} {:<14} default {}",
                        component.name,
                        serde_json::to_value(component.kind)?
                            .as_str()
                            .unwrap_or_default(),
                        component.default_value
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_changes(changes: &[(String, Change)], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let only: Vec<&Change> = changes.iter().map(|(_, c)| c).collect();
            println!("{}", serde_json::to_string_pretty(&only)?);
        }
        OutputFormat::Text => {
            for (name, change) in changes {
                println!(
                    "{} [datapoint {}, dataset {}, {}] {}",
                    name,
                    change.data_point_id,
                    change.dataset,
                    change.timestamp.to_rfc3339(),
                    change.description
                );
            }
            println!("{} change(s) detected", changes.len());
        }
    }
    Ok(())
}

/// Run the configured models of every variable in the input file
fn run_analysis(
    input: PathBuf,
    config: Option<PathBuf>,
    recalculate: bool,
    format: OutputFormat,
) -> Result<()> {
    let engine_config = match config {
        Some(path) => EngineConfig::from_toml(path)?,
        None => EngineConfig::default(),
    };
    let registry = ModelRegistry::with_settings(&engine_config);
    let driver = AnalysisDriver::new(&registry);

    let input = AnalysisInput::from_file(&input)?;
    check_detection_configs(&registry, &input.variables)?;

    let history: InMemoryHistory = input.data_points.into_iter().collect();
    tracing::debug!(
        "Loaded {} variables and {} datapoints",
        input.variables.len(),
        history.len()
    );

    let mut changes = Vec::new();
    let mut failed = 0;
    for variable in &input.variables {
        let mut consumer = |change: Change| changes.push((variable.name.clone(), change));
        let result = if recalculate {
            driver.recalculate(variable, &history, &mut consumer)
        } else {
            let request = AnalysisRequest {
                since: input.last_changes.get(&variable.id).copied(),
            };
            driver.analyze_variable(variable, &history, &request, &mut consumer)
        };

        match result {
            Ok(summary) => tracing::debug!(
                "Variable {}: {} models, {} changes",
                summary.variable_id,
                summary.models_run,
                summary.changes
            ),
            Err(e) if e.is_configuration() => {
                return Err(e)
                    .with_context(|| format!("Variable {} ({})", variable.id, variable.name));
            }
            Err(e) => {
                tracing::error!("Analysis of variable {} failed: {}", variable.id, e);
                eprintln!(
                    "Analysis of variable {} ({}) failed: {:#}",
                    variable.id,
                    variable.name,
                    anyhow::Error::new(e)
                );
                failed += 1;
            }
        }
    }

    print_changes(&changes, format)?;

    if failed > 0 {
        anyhow::bail!("Analysis failed for {} variable(s)", failed);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Models { format } => {
            print_models(&ModelRegistry::global().descriptors(), format)?;
        }
        Command::Analyze {
            input,
            config,
            recalculate,
            format,
        } => run_analysis(input, config, recalculate, format)?,
    }

    Ok(())
}
