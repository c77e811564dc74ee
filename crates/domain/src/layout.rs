//! Static benchmark layout: canonical labels, composite rules and scoring
//! settings. Built once at start-up and passed explicitly to each stage.

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::task::{Dimension, Task};

/// Stage whose buckets feed the `n` totals.
pub const SINGLE_STAGE: &str = "single-stage";

/// Stage whose buckets are reported but not aggregated.
pub const MULTI_STAGE: &str = "multi-stage";

/// Multi-task stages in processing order.
pub const STAGES: [&str; 2] = [SINGLE_STAGE, MULTI_STAGE];

/// Task counts reported per stage.
pub const BUCKET_SIZES: [usize; 2] = [2, 3];

/// A derived label: the unweighted mean of its constituents. It exists for a
/// task only when every constituent exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeRule {
    /// Derived label
    pub label: String,
    /// Labels averaged into it
    pub constituents: Vec<String>,
    /// Tasks for which the label is undefined
    #[serde(default)]
    pub excluded_tasks: Vec<Task>,
}

impl CompositeRule {
    /// New rule over the given constituents.
    pub fn new(label: &str, constituents: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            constituents: constituents.iter().map(|c| c.to_string()).collect(),
            excluded_tasks: Vec::new(),
        }
    }

    /// Mark the label undefined for a task.
    pub fn excluding(mut self, task: Task) -> Self {
        self.excluded_tasks.push(task);
        self
    }

    /// Whether the label is defined for a task.
    pub fn applies_to(&self, task: Task) -> bool {
        !self.excluded_tasks.contains(&task)
    }
}

/// Canonical labels and composites of the `d` or `f` dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionLayout {
    /// Dimension described
    pub dimension: Dimension,
    /// Radar labels in order
    pub labels: Vec<String>,
    /// Derived labels
    pub composites: Vec<CompositeRule>,
}

impl DimensionLayout {
    /// Whether a label is defined for a task in this dimension.
    pub fn label_applies(&self, label: &str, task: Task) -> bool {
        self.composites
            .iter()
            .find(|c| c.label == label)
            .map_or(true, |c| c.applies_to(task))
    }
}

/// Everything the aggregation and normalisation stages need to know about the
/// shape of the benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkLayout {
    /// Tasks in report order
    pub tasks: Vec<Task>,
    /// Dimension `d`
    pub d: DimensionLayout,
    /// Dimension `f`
    pub f: DimensionLayout,
    /// Task-count buckets of dimension `n`
    pub n_labels: Vec<String>,
}

impl Default for BenchmarkLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl BenchmarkLayout {
    /// The published benchmark layout.
    pub fn standard() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        Self {
            tasks: Task::ALL.to_vec(),
            d: DimensionLayout {
                dimension: Dimension::D,
                labels: strings(&["default", "case", "robust", "semantic_equal", "alter_symbol"]),
                composites: vec![
                    CompositeRule::new("case", &["lower_case", "upper_case"]),
                    CompositeRule::new("robust", &["grammar_robust", "syntax_robust"]),
                    CompositeRule::new(
                        "semantic_equal",
                        &[
                            "semantic_equal_complex",
                            "semantic_equal_neutral",
                            "semantic_equal_simple",
                        ],
                    ),
                ],
            },
            f: DimensionLayout {
                dimension: Dimension::F,
                labels: strings(&["constrain", "case", "decoration", "json"]),
                composites: vec![
                    CompositeRule::new("case", &["lower_case", "upper_case"]).excluding(Task::S2tt),
                    CompositeRule::new("decoration", &["prefix", "suffix", "wrap"]),
                ],
            },
            n_labels: strings(&["2-task", "3-task"]),
        }
    }

    /// Layout of `d` or `f`; `None` for `n`.
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionLayout> {
        match dimension {
            Dimension::D => Some(&self.d),
            Dimension::F => Some(&self.f),
            Dimension::N => None,
        }
    }

    /// Stage bucket name for a task count (`2` → `2-TASK`).
    pub fn bucket_for_size(size: usize) -> String {
        format!("{size}-TASK")
    }

    /// Stage bucket name for an `n` label (`2-task` → `2-TASK`).
    pub fn n_bucket(label: &str) -> String {
        label.to_uppercase()
    }

    /// Keys of the overall feature vector in radar order.
    pub fn overall_labels(&self) -> Vec<String> {
        let d = self.d.labels.iter().map(|l| format!("{}-{l}", Dimension::D.overall_prefix()));
        let f = self.f.labels.iter().map(|l| format!("{}-{l}", Dimension::F.overall_prefix()));
        let n = self.n_labels.iter().map(|l| format!("{}-{l}", Dimension::N.overall_prefix()));
        d.chain(f).chain(n).collect()
    }
}

/// Distance thresholds of the transcript `constrain` check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstrainThresholds {
    /// Reject when WER (as a fraction) is at least this
    pub max_wer: f64,
    /// Reject when the alignment has at least this many insertions
    pub max_insertions: usize,
}

impl Default for ConstrainThresholds {
    fn default() -> Self {
        Self {
            max_wer: 1.0,
            max_insertions: 3,
        }
    }
}

/// Numeric settings shared by scoring, aggregation and normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Denominator guard
    pub epsilon: f64,
    /// Transcript constrain thresholds
    pub constrain: ConstrainThresholds,
    /// Decimal places applied to each normalised leaf, if any
    pub normalized_precision: Option<u32>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            constrain: ConstrainThresholds::default(),
            normalized_precision: None,
        }
    }
}

impl ScoringSettings {
    /// Check ranges.
    pub fn validate(&self) -> DomainResult<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(DomainError::InvalidSetting {
                field: "scoring.epsilon".into(),
                message: format!("must be positive, got {}", self.epsilon),
            });
        }
        if !(self.constrain.max_wer.is_finite() && self.constrain.max_wer >= 0.0) {
            return Err(DomainError::InvalidSetting {
                field: "scoring.constrain.max_wer".into(),
                message: format!("must be non-negative, got {}", self.constrain.max_wer),
            });
        }
        Ok(())
    }
}
