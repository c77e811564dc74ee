//! Dimension Aggregator - composite labels and per-model totals
//!
//! Composites are derived in one pass from the layout's declarative rules:
//! a composite is added to a task only when every constituent is present
//! and the task does not already carry it. Totals are instruction-following
//! rates averaged over the tasks that define each label.

use audio_ifeval_domain::{
    precision_of, round_to, BenchmarkLayout, CohortMetrics, CompositeRule, Dimension, MetricRecord,
    MetricValue, ModelMetrics, Task, TaskMetrics, SINGLE_STAGE,
};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Dimension totals and the flat overall record of one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTotals {
    /// `d` label to mean IFR
    pub d: MetricRecord,
    /// `f` label to mean IFR
    pub f: MetricRecord,
    /// `n` bucket to mean IFR, zero when the model has no multi-task results
    pub n: MetricRecord,
    /// `D-<label>`, `F-<label>`, `N-<label>` in radar order
    pub overall: MetricRecord,
}

/// Cohort after aggregation: trees with composites, plus totals per model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedCohort {
    /// Metric trees including derived labels
    pub metrics: CohortMetrics,
    /// Totals in cohort order
    pub totals: IndexMap<String, ModelTotals>,
}

/// Aggregator over one model's metric tree
#[derive(Debug, Clone, Default)]
pub struct DimensionAggregator {
    layout: BenchmarkLayout,
}

fn mean(values: &[f64]) -> MetricValue {
    if values.is_empty() {
        MetricValue::NotApplicable
    } else {
        MetricValue::finite(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl DimensionAggregator {
    /// Create an aggregator for a layout
    pub fn new(layout: BenchmarkLayout) -> Self {
        Self { layout }
    }

    /// Layout in use
    pub fn layout(&self) -> &BenchmarkLayout {
        &self.layout
    }

    /// Mean of the constituents, key by key in the first constituent's order.
    /// A key missing or not applicable in any constituent is not applicable.
    fn composite(rule: &CompositeRule, metrics: &TaskMetrics) -> Option<MetricRecord> {
        let constituents: Vec<&MetricRecord> = rule
            .constituents
            .iter()
            .map(|label| metrics.get(label))
            .collect::<Option<_>>()?;
        let first = constituents.first()?;

        let mut record = MetricRecord::new();
        for key in first.keys() {
            let values: Option<Vec<f64>> = constituents.iter().map(|c| c.value(key)).collect();
            let value = values.map_or(MetricValue::NotApplicable, |v| mean(&v).rounded(precision_of(key)));
            record.insert(key, value);
        }
        Some(record)
    }

    /// Add every applicable composite to each task of a dimension.
    pub fn add_composites(&self, dimension: Dimension, tasks: &mut IndexMap<String, TaskMetrics>) {
        let Some(layout) = self.layout.dimension(dimension) else {
            return;
        };
        for (task_name, metrics) in tasks.iter_mut() {
            let task = task_name.parse::<Task>().ok();
            for rule in &layout.composites {
                if metrics.contains_key(&rule.label) || task.map_or(false, |t| !rule.applies_to(t)) {
                    continue;
                }
                match Self::composite(rule, metrics) {
                    Some(record) => {
                        metrics.insert(rule.label.clone(), record);
                    }
                    None => debug!(task = %task_name, label = %rule.label, "Composite skipped, constituent missing"),
                }
            }
        }
    }

    /// Mean IFR per canonical label across the tasks that carry it.
    pub fn dimension_totals(&self, dimension: Dimension, tasks: &IndexMap<String, TaskMetrics>) -> MetricRecord {
        let Some(layout) = self.layout.dimension(dimension) else {
            return MetricRecord::new();
        };
        let mut totals = MetricRecord::new();
        for label in &layout.labels {
            let ifrs: Vec<f64> = self
                .layout
                .tasks
                .iter()
                .filter_map(|task| tasks.get(task.as_str())?.get(label)?.ifr())
                .collect();
            totals.insert(label.clone(), mean(&ifrs).rounded(2));
        }
        totals
    }

    /// Mean IFR of the single-stage buckets. A model without multi-task
    /// results, or without a bucket, gets zero.
    pub fn multitask_totals(&self, metrics: &ModelMetrics) -> MetricRecord {
        let mut totals = MetricRecord::new();
        for label in &self.layout.n_labels {
            let bucket = metrics.multitask_bucket(SINGLE_STAGE, &BenchmarkLayout::n_bucket(label));
            let value = match bucket {
                Some(records) => {
                    let ifrs: Vec<f64> = records.values().filter_map(MetricRecord::ifr).collect();
                    match mean(&ifrs) {
                        MetricValue::Value(v) => round_to(v, 2),
                        MetricValue::NotApplicable => 0.0,
                    }
                }
                None => 0.0,
            };
            totals.insert(label.clone(), value);
        }
        totals
    }

    /// Composites, totals and the overall record of one model.
    pub fn aggregate(&self, mut metrics: ModelMetrics) -> (ModelMetrics, ModelTotals) {
        self.add_composites(Dimension::D, &mut metrics.d);
        self.add_composites(Dimension::F, &mut metrics.f);

        let d = self.dimension_totals(Dimension::D, &metrics.d);
        let f = self.dimension_totals(Dimension::F, &metrics.f);
        let n = self.multitask_totals(&metrics);

        let mut overall = MetricRecord::new();
        for (dimension, totals) in [(Dimension::D, &d), (Dimension::F, &f), (Dimension::N, &n)] {
            for (label, value) in &totals.0 {
                overall.insert(format!("{}-{label}", dimension.overall_prefix()), *value);
            }
        }
        (metrics, ModelTotals { d, f, n, overall })
    }

    /// Aggregate every model of a cohort in parallel, keeping cohort order.
    #[instrument(skip(self, cohort), fields(models = cohort.len()))]
    pub fn aggregate_cohort(&self, cohort: CohortMetrics) -> AggregatedCohort {
        let models: Vec<(String, ModelMetrics)> = cohort.0.into_iter().collect();
        let aggregated: Vec<(String, ModelMetrics, ModelTotals)> = models
            .into_par_iter()
            .map(|(name, metrics)| {
                let (metrics, totals) = self.aggregate(metrics);
                (name, metrics, totals)
            })
            .collect();

        let mut result = AggregatedCohort::default();
        for (name, metrics, totals) in aggregated {
            debug!(
                model = %name,
                default_ifr = %totals.overall.get("D-default").unwrap_or(MetricValue::NotApplicable),
                "Model aggregated"
            );
            result.metrics.insert(name.clone(), metrics);
            result.totals.insert(name, totals);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(value: serde_json::Value) -> ModelMetrics {
        serde_json::from_value(value).unwrap()
    }

    fn d_tree() -> ModelMetrics {
        model(json!({
            "d": {
                "asr": {
                    "default": {"ifr": 90.0, "wer": 10.0},
                    "lower_case": {"ifr": 80.0, "wer": 12.0},
                    "upper_case": {"ifr": 70.0, "wer": 15.0},
                    "grammar_robust": {"ifr": 60.0, "wer": 20.0}
                },
                "ser": {
                    "default": {"ifr": 50.0, "acc": 40.0},
                    "lower_case": {"ifr": 100.0, "acc": "N/A"},
                    "upper_case": {"ifr": 90.0, "acc": 30.0}
                }
            }
        }))
    }

    #[test]
    fn test_composite_is_the_mean_of_constituents() {
        // Arrange
        let aggregator = DimensionAggregator::default();
        let mut metrics = d_tree();

        // Act
        aggregator.add_composites(Dimension::D, &mut metrics.d);

        // Assert
        let case = &metrics.d["asr"]["case"];
        assert_eq!(case.value("ifr"), Some(75.0));
        assert_eq!(case.value("wer"), Some(13.5));
        // syntax_robust is missing, so no partial robust
        assert!(!metrics.d["asr"].contains_key("robust"));
        assert!(!metrics.d["asr"].contains_key("semantic_equal"));
    }

    #[test]
    fn test_composite_with_not_applicable_constituent() {
        let mut metrics = d_tree();
        DimensionAggregator::default().add_composites(Dimension::D, &mut metrics.d);
        let case = &metrics.d["ser"]["case"];
        assert_eq!(case.value("ifr"), Some(95.0));
        assert!(case.get("acc").unwrap().is_not_applicable());
    }

    #[test]
    fn test_existing_composite_is_kept() {
        let mut metrics = model(json!({"d": {"asr": {
            "case": {"ifr": 1.0, "wer": 1.0},
            "lower_case": {"ifr": 80.0, "wer": 12.0},
            "upper_case": {"ifr": 70.0, "wer": 15.0}
        }}}));
        DimensionAggregator::default().add_composites(Dimension::D, &mut metrics.d);
        assert_eq!(metrics.d["asr"]["case"].value("ifr"), Some(1.0));
    }

    #[test]
    fn test_case_is_never_built_for_f_translation() {
        let mut metrics = model(json!({"f": {"s2tt": {
            "lower_case": {"ifr": 80.0, "bleu": 12.0},
            "upper_case": {"ifr": 70.0, "bleu": 15.0}
        }}}));
        DimensionAggregator::default().add_composites(Dimension::F, &mut metrics.f);
        assert!(!metrics.f["s2tt"].contains_key("case"));
    }

    #[test]
    fn test_dimension_totals_average_present_tasks() {
        let mut metrics = d_tree();
        let aggregator = DimensionAggregator::default();
        aggregator.add_composites(Dimension::D, &mut metrics.d);

        let totals = aggregator.dimension_totals(Dimension::D, &metrics.d);

        assert_eq!(totals.value("default"), Some(70.0));
        assert_eq!(totals.value("case"), Some(85.0));
        assert!(totals.get("robust").unwrap().is_not_applicable());
        let keys: Vec<_> = totals.keys().collect();
        assert_eq!(keys, vec!["default", "case", "robust", "semantic_equal", "alter_symbol"]);
    }

    #[test]
    fn test_multitask_totals_zero_fill() {
        let aggregator = DimensionAggregator::default();
        let without = aggregator.multitask_totals(&ModelMetrics::default());
        assert_eq!(without.value("2-task"), Some(0.0));
        assert_eq!(without.value("3-task"), Some(0.0));

        let with = model(json!({"n": {"only": {"single-stage": {
            "2-TASK": {
                "ASR": {"ifr": 90.0, "wer": 10.0, "n": 4},
                "SER": {"ifr": 60.0, "acc": 50.0, "n": 4},
                "GR": {"ifr": 30.0, "acc": 50.0, "n": 4}
            },
            "separation": {"ifr": 25.0, "n": 4}
        }}}}));
        let totals = aggregator.multitask_totals(&with);
        assert_eq!(totals.value("2-task"), Some(60.0));
        assert_eq!(totals.value("3-task"), Some(0.0));
    }

    #[test]
    fn test_overall_record_order() {
        let (_, totals) = DimensionAggregator::default().aggregate(d_tree());
        let keys: Vec<_> = totals.overall.keys().collect();
        assert_eq!(keys, BenchmarkLayout::standard().overall_labels());
        assert_eq!(totals.overall.value("D-default"), Some(70.0));
        assert!(totals.overall.get("F-json").unwrap().is_not_applicable());
        assert_eq!(totals.overall.value("N-2-task"), Some(0.0));
    }

    #[test]
    fn test_cohort_keeps_order() {
        let mut cohort = CohortMetrics::default();
        for name in ["zeta", "alpha", "mid"] {
            cohort.insert(name, d_tree());
        }
        let aggregated = DimensionAggregator::default().aggregate_cohort(cohort);
        let names: Vec<_> = aggregated.totals.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert!(aggregated.metrics.get("alpha").unwrap().d["asr"].contains_key("case"));
    }
}
