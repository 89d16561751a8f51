//! CLI argument parsing for Changewatch

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for changes and model descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "changewatch")]
#[command(version)]
#[command(about = "Change detection for performance test results", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available models and their configuration components
    Models {
        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the configured models of every variable in an input file
    Analyze {
        /// JSON file with `variables`, `dataPoints` and optional `lastChanges`
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Recompute all changes from scratch instead of checking the newest data
        #[arg(long = "recalculate")]
        recalculate: bool,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_models_default_format() {
        let cli = Cli::parse_from(["changewatch", "models"]);
        assert!(!cli.debug);
        assert!(matches!(
            cli.command,
            Command::Models {
                format: OutputFormat::Text
            }
        ));
    }

    #[test]
    fn test_cli_analyze_arguments() {
        let cli = Cli::parse_from([
            "changewatch",
            "analyze",
            "--input",
            "data.json",
            "--config",
            "engine.toml",
            "--recalculate",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Analyze {
                input,
                config,
                recalculate,
                format,
            } => {
                assert_eq!(input, PathBuf::from("data.json"));
                assert_eq!(config, Some(PathBuf::from("engine.toml")));
                assert!(recalculate);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_debug_after_subcommand() {
        let cli = Cli::parse_from(["changewatch", "analyze", "-i", "x.json", "--debug"]);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_analyze_requires_input() {
        assert!(Cli::try_parse_from(["changewatch", "analyze"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["changewatch"]).is_err());
    }
}
