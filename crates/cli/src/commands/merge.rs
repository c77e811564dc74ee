//! Merge a model's output tree

use std::path::Path;

use anyhow::Result;
use audio_ifeval_benchmarks::run_merge;
use colored::Colorize;

/// Merge `<dir>/{d,f,n}` into the model's collected metrics file
pub fn run(dir: &Path, model: &str) -> Result<()> {
    let path = run_merge(dir, model)?;
    println!("{} {}", "Merged output written to:".green().bold(), path.display());
    Ok(())
}
