//! Score one response file

use anyhow::Result;
use audio_ifeval_benchmarks::{run_metric, MetricRequest};
use audio_ifeval_common::to_pretty_json_line;
use colored::Colorize;

use super::CommandContext;
use crate::output::OutputFormat;

/// Score a response file and write its metric file
pub fn run(ctx: &CommandContext, request: &MetricRequest) -> Result<()> {
    let run = run_metric(request, &ctx.config.scoring_settings())?;

    if ctx.format == OutputFormat::Json {
        print!("{}", to_pretty_json_line(&run)?);
        return Ok(());
    }
    println!(
        "{} {} samples ({}/{})",
        "Scored".green().bold(),
        run.samples,
        run.dimension,
        run.task
    );
    println!("  Labels: {}", run.labels.join(", "));
    println!("  Output: {}", run.output.display());
    Ok(())
}
