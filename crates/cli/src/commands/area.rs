//! Cohort area report

use std::path::Path;

use anyhow::Result;
use audio_ifeval_benchmarks::run_area;

use super::CommandContext;
use crate::output::{render_report, OutputFormat};

/// Print the IFR and RPS area blocks for a tested model
pub fn run(ctx: &CommandContext, model: &str, metrics: Option<&Path>, json: bool) -> Result<()> {
    let report = run_area(model, metrics, &ctx.config)?;
    let format = if json { OutputFormat::Json } else { ctx.format };
    print!("{}", render_report(&report, format)?);
    Ok(())
}
