//! Audio IFEval CLI
//!
//! Command-line interface for scoring model responses, merging a model's
//! metric files and computing the cohort area report.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use audio_ifeval_benchmarks::MetricRequest;
use audio_ifeval_cli::commands::{area, merge, metric, CommandContext};
use audio_ifeval_cli::output::OutputFormat;
use audio_ifeval_common::{init_tracing, EvalConfig};
use audio_ifeval_domain::{Dimension, Task};

/// Output format for CLI commands
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum CliOutputFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON output
    Json,
    /// Markdown output
    Markdown,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Text => OutputFormat::Text,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "audio-ifeval")]
#[command(author, version, about = "Instruction-following evaluation for audio language models")]
#[command(long_about = "Instruction-following evaluation for audio language models.\n\n\
    Score response files per dimension and task, merge a model's metric files, \
    and compare the model against a reference cohort with radar areas.")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
    format: CliOutputFormat,

    /// Configuration file (merged over config/default.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score one response file and write its metric file
    #[command(alias = "m")]
    Metric {
        /// Dimension (d, f, n)
        #[arg(long)]
        dim: Dimension,

        /// Task (asr, gr, ser, s2tt, aac); required for d and f, not allowed for n
        #[arg(long)]
        task: Option<Task>,

        /// Tested model name
        #[arg(long, alias = "test_model")]
        test_model: String,

        /// Response file (JSON array, object or NDJSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Metric file (defaults to <input dir>/output/<dim>/<task>/...)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Merge a model's d/f/n metric files into one file
    Merge {
        /// The model's output directory
        #[arg(long, alias = "model_output")]
        model_output: PathBuf,

        /// Key the merged metrics are stored under
        #[arg(long, alias = "model_name")]
        model_name: String,
    },

    /// Compute IFR and RPS radar areas against the reference cohort
    #[command(alias = "a")]
    Area {
        /// Tested model name
        #[arg(value_name = "MODEL")]
        model: String,

        /// Merged metrics file of the tested model
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Print both blocks as one JSON object
        #[arg(long)]
        json: bool,
    },
}

fn execute(cli: Cli) -> Result<()> {
    let config = EvalConfig::load(cli.config.as_deref())?;

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.telemetry.log_level.as_str()
    };
    init_tracing(config.telemetry.json_logging, log_level)?;

    let ctx = CommandContext::new(config, cli.format.into());

    match cli.command {
        Commands::Metric {
            dim,
            task,
            test_model,
            input,
            output,
        } => {
            let request = MetricRequest {
                dimension: dim,
                task,
                model: test_model,
                input,
                output,
            };
            metric::run(&ctx, &request)
        }
        Commands::Merge {
            model_output,
            model_name,
        } => merge::run(&model_output, &model_name),
        Commands::Area { model, metrics, json } => area::run(&ctx, &model, metrics.as_deref(), json),
    }
}

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let verbose = cli.verbose;
    if let Err(e) = execute(cli) {
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), e);
        if verbose {
            eprintln!("\n{}", "Details:".dimmed());
            eprintln!("{:?}", e);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_metric() {
        let cli = Cli::try_parse_from([
            "audio-ifeval",
            "metric",
            "--dim",
            "f",
            "--task",
            "asr",
            "--test_model",
            "qwen",
            "--input",
            "egs/qwen/data/f_asr.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Metric { dim, task, test_model, output, .. } => {
                assert_eq!(dim, Dimension::F);
                assert_eq!(task, Some(Task::Asr));
                assert_eq!(test_model, "qwen");
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_dimension() {
        let result = Cli::try_parse_from([
            "audio-ifeval",
            "metric",
            "--dim",
            "x",
            "--test-model",
            "qwen",
            "--input",
            "in.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_area_with_global_flags() {
        let cli = Cli::try_parse_from(["audio-ifeval", "area", "qwen", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Area { model, json, metrics } => {
                assert_eq!(model, "qwen");
                assert!(json);
                assert!(metrics.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_merge() {
        let cli = Cli::try_parse_from([
            "audio-ifeval",
            "merge",
            "--model-output",
            "egs/qwen/output",
            "--model-name",
            "qwen",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Merge { .. }));
    }
}
