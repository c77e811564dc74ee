//! Audio IFEval run orchestration
//!
//! This crate drives the evaluation pipeline over files on disk. It reads
//! model responses, writes per-task metric files, merges a model's output
//! tree and computes the cohort area report.
//!
//! ## Architecture
//!
//! - **io**: sample loading, metric files, merge and cohort loading
//! - **result**: `MetricRun` and the `AreaReport` printed by `area`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use audio_ifeval_benchmarks::run_area;
//! use audio_ifeval_common::EvalConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = EvalConfig::load(None)?;
//!     let report = run_area("qwen2-audio", None, &config)?;
//!     print!("{report}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod io;
pub mod result;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use audio_ifeval_application::{
    radar_vector, ComplianceClassifier, CrossModelNormalizer, DimensionAggregator, MetricScorer, MultiTaskScorer,
    RadarAreaScorer,
};
use audio_ifeval_common::EvalConfig;
use audio_ifeval_domain::{BenchmarkLayout, CohortMetrics, Dimension, MetricRecord, ModelMetrics, ScoringSettings, Task, MULTITASK_ROOT};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub use result::{AreaReport, MetricRun};

/// One `metric` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRequest {
    /// Dimension to score
    pub dimension: Dimension,
    /// Task, required for `d`/`f` and absent for `n`
    pub task: Option<Task>,
    /// Tested model name
    pub model: String,
    /// Response file
    pub input: PathBuf,
    /// Metric file; derived from the input when absent
    pub output: Option<PathBuf>,
}

impl MetricRequest {
    /// Checks the task against the dimension and that the input exists.
    pub fn validate(&self) -> Result<()> {
        match (self.dimension, self.task) {
            (Dimension::D | Dimension::F, None) => bail!("--task is required for dim {}", self.dimension),
            (Dimension::N, Some(task)) => bail!("dim=n does not take a task (got {task})"),
            _ => {}
        }
        if !self.input.exists() {
            bail!("Input file not found: {}", self.input.display());
        }
        Ok(())
    }

    /// Metric file to write.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| io::default_metric_path(&self.input, self.dimension, self.task, &self.model))
    }
}

/// Scores one response file and writes its metric file.
///
/// `d` and `f` files are classified per variation and scored with the
/// task's metric suite; `n` files go through the multi-task scorer.
///
/// # Arguments
///
/// * `request` - What to score and where to write it
/// * `settings` - Scoring settings, including the constrain thresholds
///
/// # Returns
///
/// A `MetricRun` naming the written file and its labels.
///
/// # Errors
///
/// Returns an error if the request is invalid, the input cannot be read or
/// parsed, a variation has no responses, or the output cannot be written.
#[instrument(skip(settings), fields(dimension = %request.dimension, model = %request.model))]
pub fn run_metric(request: &MetricRequest, settings: &ScoringSettings) -> Result<MetricRun> {
    request.validate()?;
    let samples = io::load_samples(&request.input)?;

    let (task, output): (String, Value) = match (request.dimension, request.task) {
        (Dimension::N, _) | (_, None) => {
            let metrics = MultiTaskScorer::new(settings.constrain).score(&samples);
            (MULTITASK_ROOT.to_string(), serde_json::to_value(metrics)?)
        }
        (dimension, Some(task)) => {
            let classifier = ComplianceClassifier::for_task(dimension, task, settings.constrain);
            let metrics = MetricScorer::new().score_task(&classifier, &samples)?;
            (task.to_string(), serde_json::to_value(metrics)?)
        }
    };

    let path = request.output_path();
    io::write_json(&path, &output)?;
    let labels = output
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();
    info!(path = %path.display(), samples = samples.len(), "Metric file written");

    Ok(MetricRun {
        dimension: request.dimension,
        task,
        samples: samples.len(),
        labels,
        output: path,
    })
}

/// Merges a model's output tree into `<dir>/<model>_collect_all_metrics.json`.
///
/// An existing merged file is copied to a timestamped backup first.
///
/// # Arguments
///
/// * `dir` - The model's output directory
/// * `model` - Key the merged body is stored under
///
/// # Returns
///
/// The path of the merged file.
#[instrument]
pub fn run_merge(dir: &Path, model: &str) -> Result<PathBuf> {
    let merged = io::merge_model_output(dir)?;
    let path = io::merged_path(dir, model);
    io::backup_existing(&path)?;

    let mut wrapped = serde_json::Map::new();
    wrapped.insert(model.to_string(), Value::Object(merged));
    io::write_json(&path, &wrapped)?;
    info!(path = %path.display(), "Merged metrics written");
    Ok(path)
}

/// Adds the tested model to the cohort and applies an explicit model order.
///
/// Listed models come first in list order; the rest keep cohort order. A
/// model already in the cohort is replaced in place.
pub fn assemble_cohort(mut cohort: CohortMetrics, model: &str, tested: ModelMetrics, order: &[String]) -> CohortMetrics {
    cohort.insert(model, tested);
    if order.is_empty() {
        return cohort;
    }

    let mut ordered = CohortMetrics::default();
    for name in order {
        if let Some(metrics) = cohort.0.shift_remove(name) {
            ordered.insert(name.clone(), metrics);
        } else {
            warn!(model = %name, "Listed model not found in cohort");
        }
    }
    for (name, metrics) in cohort.0 {
        ordered.insert(name, metrics);
    }
    ordered
}

fn block_vectors<'a, I>(records: I, labels: &[String], block: &str) -> IndexMap<String, Vec<f64>>
where
    I: IntoIterator<Item = (&'a String, &'a MetricRecord)>,
{
    records
        .into_iter()
        .filter_map(|(model, record)| match radar_vector(record, labels) {
            Some(values) => Some((model.clone(), values)),
            None => {
                warn!(model = %model, block, "Skipping model with a not applicable score");
                None
            }
        })
        .collect()
}

/// Aggregates, normalises and scores a complete cohort.
///
/// # Errors
///
/// Returns an error if a reference polygon has zero area.
pub fn area_report(layout: &BenchmarkLayout, settings: ScoringSettings, cohort: CohortMetrics) -> Result<AreaReport> {
    let labels = layout.overall_labels();

    let aggregated = DimensionAggregator::new(layout.clone()).aggregate_cohort(cohort);
    let normalizer = CrossModelNormalizer::new(layout.clone(), settings);
    let normalized = normalizer.overall(&normalizer.normalize(&aggregated.metrics));

    let ifr = block_vectors(aggregated.totals.iter().map(|(m, t)| (m, &t.overall)), &labels, "ifr");
    let rps = block_vectors(normalized.iter(), &labels, "rps");

    Ok(AreaReport {
        ifr: RadarAreaScorer::ifr(labels.len()).score_all(&ifr)?,
        rps: RadarAreaScorer::normalized(labels.len()).score_all(&rps)?,
    })
}

/// Computes the area report of a tested model against the configured cohort.
///
/// # Arguments
///
/// * `model` - Tested model name
/// * `metrics` - Its merged file; `egs/<model>/output/<model>_collect_all_metrics.json` when absent
/// * `config` - Cohort file, model order and scoring settings
///
/// # Returns
///
/// The IFR and RPS area blocks.
///
/// # Errors
///
/// Returns an error if the cohort or the tested model cannot be loaded.
#[instrument(skip(config))]
pub fn run_area(model: &str, metrics: Option<&Path>, config: &EvalConfig) -> Result<AreaReport> {
    let cohort = io::load_cohort(&config.cohort.reference_metrics)?;
    let path = metrics
        .map(Path::to_path_buf)
        .unwrap_or_else(|| io::default_model_metrics_path(model));
    let tested = io::load_model_metrics(&path, model)?;

    let cohort = assemble_cohort(cohort, model, tested, &config.cohort.models);
    let report = area_report(&BenchmarkLayout::standard(), config.scoring_settings(), cohort)?;
    info!(ifr = report.ifr.len(), rps = report.rps.len(), "Area report computed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_ifeval_testing::{create_full_model_metrics, create_test_cohort};
    use std::fs;
    use tempfile::TempDir;

    const PREFIX_SAMPLES: &str = r#"[{"text": "hello world", "variation_responses": {"prefix": [
        {"response": "The transcript is: hello world", "prefix": "The transcript is: "},
        {"response": "hello world", "prefix": "The transcript is: "}
    ]}}]"#;

    fn request(dimension: Dimension, task: Option<Task>, input: PathBuf, output: Option<PathBuf>) -> MetricRequest {
        MetricRequest {
            dimension,
            task,
            model: "m".to_string(),
            input,
            output,
        }
    }

    #[test]
    fn test_request_validation() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.json");
        fs::write(&input, "[]").unwrap();

        assert!(request(Dimension::F, None, input.clone(), None).validate().is_err());
        assert!(request(Dimension::N, Some(Task::Asr), input.clone(), None).validate().is_err());
        assert!(request(Dimension::F, Some(Task::Asr), temp_dir.path().join("missing.json"), None)
            .validate()
            .is_err());
        assert!(request(Dimension::N, None, input, None).validate().is_ok());
    }

    #[test]
    fn test_run_metric_writes_file() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("f_asr.json");
        fs::write(&input, PREFIX_SAMPLES).unwrap();
        let output = temp_dir.path().join("out/m_f_asr_metric.json");
        let request = request(Dimension::F, Some(Task::Asr), input, Some(output.clone()));

        // Act
        let run = run_metric(&request, &ScoringSettings::default()).unwrap();

        // Assert
        assert_eq!(run.samples, 1);
        assert_eq!(run.labels, vec!["prefix", "all"]);
        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["prefix"]["ifr"], 50.0);
    }

    #[test]
    fn test_run_metric_multitask() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("n.json");
        fs::write(
            &input,
            r#"{"text": "hello", "emotion": "happy", "instructions": {"variations": {"single-stage": {
                "separation": [[{"task": "ASR|SER", "response": "hello\\HAPPY", "separator": "\\"}]]
            }}}}"#,
        )
        .unwrap();
        let output = temp_dir.path().join("n_metric.json");

        let run = run_metric(&request(Dimension::N, None, input, Some(output)), &ScoringSettings::default()).unwrap();

        assert_eq!(run.task, "only");
        assert_eq!(run.labels, vec!["single-stage"]);
    }

    #[test]
    fn test_run_merge_wraps_and_backs_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        io::write_json(&root.join("d/asr/x.json"), &serde_json::json!({"all": {"ifr": 1.0}})).unwrap();
        fs::create_dir_all(root.join("f")).unwrap();

        let first = run_merge(root, "m").unwrap();
        let second = run_merge(root, "m").unwrap();

        assert_eq!(first, second);
        let merged: Value = serde_json::from_str(&fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(merged["m"]["d"]["asr"]["all"]["ifr"], 1.0);
        let backups = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".bak."))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_assemble_cohort_order() {
        let cohort = create_test_cohort(&[("a", 90.0, 10.0), ("b", 80.0, 10.0), ("c", 70.0, 10.0)]);
        let order = vec!["c".to_string(), "ghost".to_string(), "t".to_string()];

        let cohort = assemble_cohort(cohort, "t", create_full_model_metrics(60.0, 10.0), &order);

        assert_eq!(cohort.models().collect::<Vec<_>>(), vec!["c", "t", "a", "b"]);
    }

    #[test]
    fn test_run_area_end_to_end() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let cohort_path = temp_dir.path().join("cohort.json");
        io::write_json(&cohort_path, &create_test_cohort(&[("a", 90.0, 10.0)])).unwrap();
        let tested_path = temp_dir.path().join("b_collect_all_metrics.json");
        io::write_json(&tested_path, &create_test_cohort(&[("b", 50.0, 20.0)])).unwrap();

        let mut config = EvalConfig::default();
        config.cohort.reference_metrics = cohort_path;
        config.cohort.models = vec!["b".to_string(), "a".to_string()];

        // Act
        let report = run_area("b", Some(&tested_path), &config).unwrap();

        // Assert
        assert_eq!(report.ifr.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(report.ifr["a"], 81.0);
        assert_eq!(report.ifr["b"], 25.0);
        assert!(report.rps["b"] > report.rps["a"]);
        assert!(report.rps.values().all(|v| *v > 0.0 && *v <= 100.0));
    }

    #[test]
    fn test_area_report_skips_incomplete_models() {
        let mut cohort = create_test_cohort(&[("full", 80.0, 10.0)]);
        cohort.insert("empty", ModelMetrics::default());

        let report = area_report(&BenchmarkLayout::standard(), ScoringSettings::default(), cohort).unwrap();

        assert!(report.ifr.contains_key("full"));
        assert!(!report.ifr.contains_key("empty"));
        assert!(!report.rps.contains_key("empty"));
    }
}
