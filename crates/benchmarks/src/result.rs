//! Run results: the per-file metric summary and the cohort area report.

use std::fmt;
use std::path::PathBuf;

use audio_ifeval_domain::Dimension;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome of one `metric` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRun {
    /// Scored dimension
    pub dimension: Dimension,
    /// Task directory name (`only` for `n`)
    pub task: String,
    /// Samples read from the input
    pub samples: usize,
    /// Labels written, in file order
    pub labels: Vec<String>,
    /// Written metric file
    pub output: PathBuf,
}

/// Area scores of a cohort, one block per score family.
///
/// Each block maps a model to its polygon area relative to the reference
/// polygon, in percent with one decimal.
///
/// # Example
///
/// ```rust
/// use audio_ifeval_benchmarks::result::AreaReport;
///
/// let mut report = AreaReport::default();
/// report.ifr.insert("qwen".to_string(), 81.0);
/// report.rps.insert("qwen".to_string(), 100.0);
///
/// let text = report.to_string();
/// assert!(text.starts_with("Overall IFR Areas Score:"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    /// Areas of the raw IFR vectors
    pub ifr: IndexMap<String, f64>,
    /// Areas of the cross-model normalised vectors
    pub rps: IndexMap<String, f64>,
}

impl AreaReport {
    /// Models present in either block, IFR order first.
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.ifr.keys().map(String::as_str).collect();
        for model in self.rps.keys() {
            if !self.ifr.contains_key(model) {
                models.push(model);
            }
        }
        models
    }

    /// Renders the report as a Markdown table, one row per model.
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("| Model | IFR Area | RPS Area |\n|-------|----------|----------|\n");
        let cell = |v: Option<&f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
        for model in self.models() {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                model,
                cell(self.ifr.get(model)),
                cell(self.rps.get(model))
            ));
        }
        md
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, title: &str, block: &IndexMap<String, f64>) -> fmt::Result {
    writeln!(f, "{title}")?;
    let body: Vec<String> = block.iter().map(|(model, score)| format!("'{model}': {score:.1}")).collect();
    writeln!(f, "{{{}}}", body.join(", "))
}

impl fmt::Display for AreaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, "Overall IFR Areas Score:", &self.ifr)?;
        write_block(f, "Overall RPS Areas Score:", &self.rps)
    }
}
