//! Cross-Model Normalizer
//!
//! Every (dimension, label, task) primary metric is rescaled against the
//! cohort: `v / (max + ε)` when higher is better, `min / (v + ε)` when lower
//! is better. Models without the metric are left out of that cohort and of
//! its result. The multi-task buckets are then zero-filled so every model
//! can be drawn.

use audio_ifeval_domain::{
    round_to, BenchmarkLayout, CohortMetrics, Dimension, Direction, MetricRecord, MetricValue, ModelMetrics,
    ScoringSettings, SubTask, Task, SINGLE_STAGE,
};
use indexmap::IndexMap;
use tracing::{debug, instrument};

/// Model name to normalised score.
pub type ModelScores = IndexMap<String, f64>;

/// Normalised scores of a cohort. Meaningless outside that cohort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedCohort {
    /// Models in cohort order
    pub models: Vec<String>,
    /// `d` label → task → scores
    pub d: IndexMap<String, IndexMap<Task, ModelScores>>,
    /// `f` label → task → scores
    pub f: IndexMap<String, IndexMap<Task, ModelScores>>,
    /// `n` bucket → scores, one per model
    pub n: IndexMap<String, ModelScores>,
}

impl NormalizedCohort {
    /// Per-task scores of a `d` or `f` label.
    pub fn label(&self, dimension: Dimension, label: &str) -> Option<&IndexMap<Task, ModelScores>> {
        match dimension {
            Dimension::D => self.d.get(label),
            Dimension::F => self.f.get(label),
            Dimension::N => None,
        }
    }
}

/// The cross-model normalizer
#[derive(Debug, Clone, Default)]
pub struct CrossModelNormalizer {
    layout: BenchmarkLayout,
    settings: ScoringSettings,
}

impl CrossModelNormalizer {
    /// Create a normalizer
    pub fn new(layout: BenchmarkLayout, settings: ScoringSettings) -> Self {
        Self { layout, settings }
    }

    fn round(&self, value: f64) -> f64 {
        match self.settings.normalized_precision {
            Some(places) => round_to(value, places),
            None => value,
        }
    }

    /// Rescale one metric across the models that report it. An empty input
    /// yields an empty result.
    pub fn rescale(&self, direction: Direction, values: &ModelScores) -> ModelScores {
        let eps = self.settings.epsilon;
        match direction {
            Direction::HigherIsBetter => {
                let Some(max) = values.values().copied().reduce(f64::max) else {
                    return ModelScores::new();
                };
                values
                    .iter()
                    .map(|(model, v)| (model.clone(), self.round(v / (max + eps))))
                    .collect()
            }
            Direction::LowerIsBetter => {
                let Some(min) = values.values().copied().reduce(f64::min) else {
                    return ModelScores::new();
                };
                values
                    .iter()
                    .map(|(model, v)| (model.clone(), self.round(min / (v + eps))))
                    .collect()
            }
        }
    }

    fn collect<F>(cohort: &CohortMetrics, read: F) -> ModelScores
    where
        F: Fn(&ModelMetrics) -> Option<f64>,
    {
        cohort
            .0
            .iter()
            .filter_map(|(model, metrics)| read(metrics).map(|v| (model.clone(), v)))
            .collect()
    }

    fn normalize_dimension(&self, dimension: Dimension, cohort: &CohortMetrics) -> IndexMap<String, IndexMap<Task, ModelScores>> {
        let mut out = IndexMap::new();
        let Some(layout) = self.layout.dimension(dimension) else {
            return out;
        };
        for label in &layout.labels {
            let mut per_task = IndexMap::new();
            for task in &self.layout.tasks {
                if !layout.label_applies(label, *task) {
                    continue;
                }
                let metric = task.primary_metric();
                let values = Self::collect(cohort, |m| m.record(dimension, *task, label)?.value(metric.key()));
                if values.is_empty() {
                    debug!(dimension = %dimension, label = %label, task = %task, "No model reports this metric");
                }
                per_task.insert(*task, self.rescale(metric.direction(), &values));
            }
            out.insert(label.clone(), per_task);
        }
        out
    }

    /// Bucket composite: mean of the normalised ASR, SER and GR scores, a
    /// missing sub-score counting as zero. Models without any are zero-filled.
    fn normalize_multitask(&self, cohort: &CohortMetrics) -> IndexMap<String, ModelScores> {
        let mut out = IndexMap::new();
        for label in &self.layout.n_labels {
            let bucket = BenchmarkLayout::n_bucket(label);
            let parts: Vec<ModelScores> = SubTask::ALL
                .iter()
                .map(|sub| {
                    let metric = sub.metric();
                    let values = Self::collect(cohort, |m| {
                        m.multitask_bucket(SINGLE_STAGE, &bucket)?.get(sub.as_str())?.value(metric.key())
                    });
                    self.rescale(metric.direction(), &values)
                })
                .collect();

            let scores: ModelScores = cohort
                .models()
                .map(|model| {
                    let reported = parts.iter().any(|p| p.contains_key(model));
                    let score = if reported {
                        let sum: f64 = parts.iter().map(|p| p.get(model).copied().unwrap_or(0.0)).sum();
                        self.round(sum / parts.len() as f64)
                    } else {
                        0.0
                    };
                    (model.to_string(), score)
                })
                .collect();
            out.insert(label.clone(), scores);
        }
        out
    }

    /// Normalise a cohort whose trees already carry their composites.
    #[instrument(skip(self, cohort), fields(models = cohort.len()))]
    pub fn normalize(&self, cohort: &CohortMetrics) -> NormalizedCohort {
        NormalizedCohort {
            models: cohort.models().map(str::to_string).collect(),
            d: self.normalize_dimension(Dimension::D, cohort),
            f: self.normalize_dimension(Dimension::F, cohort),
            n: self.normalize_multitask(cohort),
        }
    }

    /// Overall normalised vector per model: each `d`/`f` label is the mean of
    /// the model's per-task scores, not applicable when it has none.
    pub fn overall(&self, normalized: &NormalizedCohort) -> IndexMap<String, MetricRecord> {
        let mut out = IndexMap::new();
        for model in &normalized.models {
            let mut record = MetricRecord::new();
            for dimension in [Dimension::D, Dimension::F] {
                let Some(layout) = self.layout.dimension(dimension) else {
                    continue;
                };
                for label in &layout.labels {
                    let scores: Vec<f64> = normalized
                        .label(dimension, label)
                        .map(|per_task| per_task.values().filter_map(|s| s.get(model).copied()).collect())
                        .unwrap_or_default();
                    let value = if scores.is_empty() {
                        MetricValue::NotApplicable
                    } else {
                        MetricValue::finite(self.round(scores.iter().sum::<f64>() / scores.len() as f64))
                    };
                    record.insert(format!("{}-{label}", dimension.overall_prefix()), value);
                }
            }
            for label in &self.layout.n_labels {
                let value = normalized.n.get(label).and_then(|s| s.get(model)).copied().unwrap_or(0.0);
                record.insert(format!("{}-{label}", Dimension::N.overall_prefix()), value);
            }
            out.insert(model.clone(), record);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cohort(entries: &[(&str, serde_json::Value)]) -> CohortMetrics {
        let mut cohort = CohortMetrics::default();
        for (name, value) in entries {
            cohort.insert(*name, serde_json::from_value(value.clone()).unwrap());
        }
        cohort
    }

    fn scores(pairs: &[(&str, f64)]) -> ModelScores {
        pairs.iter().map(|(m, v)| (m.to_string(), *v)).collect()
    }

    #[test]
    fn test_lower_is_better_example() {
        // Arrange
        let normalizer = CrossModelNormalizer::default();
        let wer = scores(&[("A", 10.0), ("B", 20.0)]);

        // Act
        let normalized = normalizer.rescale(Direction::LowerIsBetter, &wer);

        // Assert
        assert!((normalized["A"] - 10.0 / (10.0 + 1e-6)).abs() < 1e-12);
        assert!((normalized["B"] - 10.0 / (20.0 + 1e-6)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cohort_is_empty() {
        let normalizer = CrossModelNormalizer::default();
        assert!(normalizer.rescale(Direction::HigherIsBetter, &ModelScores::new()).is_empty());
    }

    #[test]
    fn test_legacy_rounding() {
        let settings = ScoringSettings {
            normalized_precision: Some(2),
            ..Default::default()
        };
        let normalizer = CrossModelNormalizer::new(BenchmarkLayout::standard(), settings);
        let normalized = normalizer.rescale(Direction::HigherIsBetter, &scores(&[("A", 30.0), ("B", 20.0)]));
        assert_eq!(normalized["A"], 1.0);
        assert_eq!(normalized["B"], 0.67);
    }

    #[test]
    fn test_absent_models_are_excluded_from_the_label() {
        let cohort = cohort(&[
            ("A", json!({"d": {"asr": {"default": {"ifr": 90.0, "wer": 10.0}}}})),
            ("B", json!({"d": {"asr": {"default": {"ifr": 80.0, "wer": "N/A"}}}})),
            ("C", json!({})),
        ]);

        let normalized = CrossModelNormalizer::default().normalize(&cohort);

        let asr = &normalized.d["default"][&Task::Asr];
        assert_eq!(asr.len(), 1);
        assert!(asr.contains_key("A"));
        assert!(normalized.d["default"][&Task::Ser].is_empty());
        assert!(!normalized.f["case"].contains_key(&Task::S2tt));
    }

    #[test]
    fn test_multitask_zero_fill_and_missing_parts() {
        let cohort = cohort(&[
            ("A", json!({"n": {"only": {"single-stage": {"2-TASK": {
                "ASR": {"ifr": 100.0, "wer": 10.0, "n": 2},
                "SER": {"ifr": 100.0, "acc": 50.0, "n": 2},
                "GR": {"ifr": 100.0, "acc": 100.0, "n": 2}
            }}}}})),
            ("B", json!({"n": {"only": {"single-stage": {"2-TASK": {
                "SER": {"ifr": 100.0, "acc": 100.0, "n": 2}
            }}}}})),
            ("C", json!({})),
        ]);
        let settings = ScoringSettings {
            normalized_precision: Some(2),
            ..Default::default()
        };

        let normalized = CrossModelNormalizer::new(BenchmarkLayout::standard(), settings).normalize(&cohort);

        let two = &normalized.n["2-task"];
        // (1.0 + 0.5 + 1.0) / 3
        assert_eq!(two["A"], 0.83);
        // only SER reported: (0 + 1.0 + 0) / 3
        assert_eq!(two["B"], 0.33);
        assert_eq!(two["C"], 0.0);
        assert_eq!(normalized.n["3-task"]["A"], 0.0);
    }

    #[test]
    fn test_overall_averages_and_keeps_order() {
        let cohort = cohort(&[
            ("A", json!({"d": {
                "asr": {"default": {"ifr": 90.0, "wer": 10.0}},
                "ser": {"default": {"ifr": 90.0, "acc": 50.0}}
            }})),
            ("B", json!({"d": {
                "asr": {"default": {"ifr": 90.0, "wer": 20.0}}
            }})),
        ]);
        let settings = ScoringSettings {
            normalized_precision: Some(2),
            ..Default::default()
        };
        let normalizer = CrossModelNormalizer::new(BenchmarkLayout::standard(), settings);

        let overall = normalizer.overall(&normalizer.normalize(&cohort));

        assert_eq!(overall["A"].value("D-default"), Some(1.0));
        // B has asr only
        assert_eq!(overall["B"].value("D-default"), Some(0.5));
        assert!(overall["B"].get("D-case").unwrap().is_not_applicable());
        assert_eq!(overall["B"].value("N-3-task"), Some(0.0));
        let keys: Vec<_> = overall["A"].keys().collect();
        assert_eq!(keys, BenchmarkLayout::standard().overall_labels());
    }
}
