//! Metric Scorer - per-variation IFR and task metrics
//!
//! The scorer classifies every response of every sample, tallies the
//! payloads per variation and hands each tally to the metric suite of the
//! (dimension, task) pair. Variations keep their first-appearance order and
//! an `all` record pools every variation.

use crate::compliance::ComplianceClassifier;
use crate::scoring::{CiderD, CorpusBleu, CorpusMetric, GoldLabel, LabelAccuracy, Meteor, RougeL, WordErrorRate};
use crate::ScoringError;
use audio_ifeval_domain::{Dimension, MetricKind, MetricRecord, MetricValue, Sample, Task, TaskMetrics};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Key of the pooled record.
pub const ALL_LABEL: &str = "all";

/// Payloads and references collected for one variation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariationTally {
    /// Responses seen
    pub total: usize,
    /// Responses that complied
    pub follows: usize,
    /// Scoring payloads, empty for non-compliant responses
    pub hypotheses: Vec<String>,
    /// References aligned with `hypotheses`
    pub references: Vec<Vec<String>>,
}

impl VariationTally {
    /// Record one classified response.
    pub fn push(&mut self, follows: bool, payload: String, references: Vec<String>) {
        self.total += 1;
        self.follows += usize::from(follows);
        self.hypotheses.push(payload);
        self.references.push(references);
    }

    /// Append another tally.
    pub fn extend(&mut self, other: &VariationTally) {
        self.total += other.total;
        self.follows += other.follows;
        self.hypotheses.extend(other.hypotheses.iter().cloned());
        self.references.extend(other.references.iter().cloned());
    }

    /// Instruction-following rate in percent; not applicable without responses.
    pub fn ifr(&self) -> MetricValue {
        if self.total == 0 {
            MetricValue::NotApplicable
        } else {
            MetricValue::finite(100.0 * self.follows as f64 / self.total as f64)
        }
    }
}

type MetricSuite = Vec<Arc<dyn CorpusMetric>>;

/// The main metric scorer
pub struct MetricScorer {
    suites: HashMap<(Dimension, Task), MetricSuite>,
}

impl Default for MetricScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricScorer {
    /// Create a scorer with the standard metric suites
    pub fn new() -> Self {
        let mut scorer = Self {
            suites: HashMap::new(),
        };
        scorer.register_default_suites();
        scorer
    }

    /// Register the standard suites
    fn register_default_suites(&mut self) {
        for dimension in [Dimension::D, Dimension::F] {
            // Transcription
            self.register_suite(dimension, Task::Asr, vec![Arc::new(WordErrorRate)]);

            // Captioning reports METEOR with CIDEr-D and ROUGE-L alongside
            self.register_suite(
                dimension,
                Task::Aac,
                vec![Arc::new(Meteor::default()), Arc::new(CiderD::default()), Arc::new(RougeL::default())],
            );
        }

        // Labels: exact gold in d, first whole-word gold in f
        for task in [Task::Ser, Task::Gr] {
            self.register_suite(Dimension::D, task, vec![Arc::new(LabelAccuracy::new(task, GoldLabel::Exact))]);
            self.register_suite(Dimension::F, task, vec![Arc::new(LabelAccuracy::new(task, GoldLabel::Canonical))]);
        }

        // Translation: d keeps the BLEU breakdown
        self.register_suite(Dimension::D, Task::S2tt, vec![Arc::new(CorpusBleu::with_breakdown())]);
        self.register_suite(Dimension::F, Task::S2tt, vec![Arc::new(CorpusBleu::default())]);
    }

    /// Register or replace the suite of a (dimension, task) pair
    pub fn register_suite(&mut self, dimension: Dimension, task: Task, metrics: MetricSuite) {
        self.suites.insert((dimension, task), metrics);
    }

    /// Get the suite of a (dimension, task) pair
    pub fn suite(&self, dimension: Dimension, task: Task) -> Option<&[Arc<dyn CorpusMetric>]> {
        self.suites.get(&(dimension, task)).map(Vec::as_slice)
    }

    /// Classify and tally every response, keyed by variation in first-appearance order.
    pub fn tally(&self, classifier: &ComplianceClassifier, samples: &[Sample]) -> IndexMap<String, VariationTally> {
        let task = classifier.task();
        let policy = classifier.policy();
        let expand_groups = classifier.dimension() == Dimension::D && task.has_multiple_references();
        let mut tallies: IndexMap<String, VariationTally> = IndexMap::new();
        let mut skipped = 0usize;

        for sample in samples {
            let references: Vec<String> = sample
                .references(task)
                .iter()
                .map(|r| policy.normalize_reference(r))
                .collect();
            if task.has_multiple_references() && references.is_empty() {
                skipped += 1;
                continue;
            }
            let judged_against = sample.text.trim();

            for (variation, items) in sample.variations(expand_groups) {
                let tally = tallies.entry(variation.clone()).or_default();
                for item in &items {
                    let result = classifier.classify(&variation, item, judged_against);
                    tally.push(result.follows, result.payload, references.clone());
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, task = %task, "Skipped samples without references");
        }
        tallies
    }

    /// Metrics of one tally, rounded per key.
    pub fn score_tally(&self, dimension: Dimension, task: Task, tally: &VariationTally) -> Result<MetricRecord, ScoringError> {
        let suite = self.suite(dimension, task).ok_or(ScoringError::MissingSuite { dimension, task })?;
        let mut record = MetricRecord::new().with(MetricKind::Ifr.key(), tally.ifr());
        for metric in suite {
            for (key, value) in metric.compute(&tally.hypotheses, &tally.references).0 {
                record.insert(key, value);
            }
        }
        Ok(record.rounded())
    }

    /// Score one metric file's samples for a (dimension, task) pair.
    #[instrument(skip(self, classifier, samples), fields(dimension = %classifier.dimension(), task = %classifier.task(), samples = samples.len()))]
    pub fn score_task(&self, classifier: &ComplianceClassifier, samples: &[Sample]) -> Result<TaskMetrics, ScoringError> {
        let (dimension, task) = (classifier.dimension(), classifier.task());
        let tallies = self.tally(classifier, samples);

        let mut metrics = TaskMetrics::new();
        let mut pooled = VariationTally::default();
        for (variation, tally) in &tallies {
            if tally.total == 0 {
                return Err(ScoringError::EmptyVariation {
                    variation: variation.clone(),
                });
            }
            let record = self.score_tally(dimension, task, tally)?;
            debug!(
                variation = %variation,
                ifr = %record.get(MetricKind::Ifr.key()).unwrap_or(MetricValue::NotApplicable),
                metric = %record.get(task.primary_metric().key()).unwrap_or(MetricValue::NotApplicable),
                "Variation scored"
            );
            metrics.insert(variation.clone(), record);
            pooled.extend(tally);
        }

        let all = self.score_tally(dimension, task, &pooled)?;
        let all = if pooled.total == 0 { all.not_applicable() } else { all };
        info!(
            variations = tallies.len(),
            responses = pooled.total,
            ifr = %all.get(MetricKind::Ifr.key()).unwrap_or(MetricValue::NotApplicable),
            "Task scored"
        );
        metrics.insert(ALL_LABEL.to_string(), all);
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_ifeval_domain::ConstrainThresholds;
    use serde_json::json;

    fn sample(value: serde_json::Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    fn classifier(dimension: Dimension, task: Task) -> ComplianceClassifier {
        ComplianceClassifier::for_task(dimension, task, ConstrainThresholds::default())
    }

    #[test]
    fn test_f_asr_scores_per_variation() {
        // Arrange
        let samples = vec![
            sample(json!({"text": "Hello world", "variation_responses": {
                "upper_case": "HELLO WORLD",
                "lower_case": "Hello world"
            }})),
            sample(json!({"text": "good morning", "variation_responses": {
                "upper_case": "GOOD MORNING",
                "lower_case": "good morning"
            }})),
        ];

        // Act
        let metrics = MetricScorer::new().score_task(&classifier(Dimension::F, Task::Asr), &samples).unwrap();

        // Assert
        let keys: Vec<_> = metrics.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["upper_case", "lower_case", "all"]);
        assert_eq!(metrics["upper_case"].value("ifr"), Some(100.0));
        assert_eq!(metrics["upper_case"].value("wer"), Some(0.0));
        assert_eq!(metrics["lower_case"].value("ifr"), Some(50.0));
        // two of four reference words deleted
        assert_eq!(metrics["lower_case"].value("wer"), Some(50.0));
        assert_eq!(metrics["all"].value("ifr"), Some(75.0));
        assert_eq!(metrics["all"].value("wer"), Some(25.0));
    }

    #[test]
    fn test_empty_variation_fails_loudly() {
        let samples = vec![sample(json!({"text": "hi", "variation_responses": {"upper_case": []}}))];
        let err = MetricScorer::new()
            .score_task(&classifier(Dimension::F, Task::Asr), &samples)
            .unwrap_err();
        assert_eq!(err.to_string(), "No response in upper_case!");
    }

    #[test]
    fn test_no_samples_yields_not_applicable_all() {
        let metrics = MetricScorer::new().score_task(&classifier(Dimension::F, Task::Ser), &[]).unwrap();
        assert_eq!(metrics.len(), 1);
        assert!(metrics["all"].get("ifr").unwrap().is_not_applicable());
        assert!(metrics["all"].get("acc").unwrap().is_not_applicable());
    }

    #[test]
    fn test_d_translation_expands_groups_and_skips_unreferenced() {
        let samples = vec![
            sample(json!({"text": "今天天气很好 | 今天天气不错", "variation_responses": {
                "semantic_equal": {
                    "semantic_equal_simple": "The translation is: 今天天气很好",
                    "semantic_equal_complex": ["hola"]
                }
            }})),
            sample(json!({"text": " | ", "variation_responses": {"default": "The translation is: x"}})),
        ];

        let metrics = MetricScorer::new().score_task(&classifier(Dimension::D, Task::S2tt), &samples).unwrap();

        let keys: Vec<_> = metrics.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["semantic_equal_simple", "semantic_equal_complex", "all"]);
        assert_eq!(metrics["semantic_equal_simple"].value("ifr"), Some(100.0));
        assert_eq!(metrics["semantic_equal_simple"].value("bleu"), Some(100.0));
        assert!(metrics["semantic_equal_simple"].get("len_ratio").is_some());
        assert_eq!(metrics["semantic_equal_complex"].value("bleu"), Some(0.0));
    }

    #[test]
    fn test_caption_side_metrics_are_reported() {
        let samples = vec![sample(json!({"text": "a dog barks", "variation_responses": {
            "default": "The audio caption is: a dog barks"
        }}))];
        let metrics = MetricScorer::new().score_task(&classifier(Dimension::D, Task::Aac), &samples).unwrap();
        let keys: Vec<_> = metrics["default"].keys().collect();
        assert_eq!(keys, vec!["ifr", "METEOR", "CIDEr-D", "ROUGE-L"]);
        assert_eq!(metrics["default"].value("ROUGE-L"), Some(1.0));
    }

    #[test]
    fn test_missing_suite_is_reported() {
        let mut scorer = MetricScorer::new();
        scorer.suites.clear();
        let err = scorer.score_tally(Dimension::F, Task::Asr, &VariationTally::default()).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_SUITE");
    }
}
