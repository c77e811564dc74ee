//! Multi-task scoring for the `n` dimension.
//!
//! Records are judged per part and tallied per stage, per task count and
//! per sub-task. Each stage also reports branch-level rates where a record
//! only counts as following when every part does.

use audio_ifeval_domain::{
    BenchmarkLayout, ConstrainThresholds, MetricKind, MetricRecord, MetricValue, MultiTaskMetrics, Sample, StageEntry,
    StageMetrics, SubTask, BUCKET_SIZES, STAGES,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::engine::VariationTally;
use super::{GoldLabel, LabelAccuracy, WordErrorRate};
use crate::compliance::{MultiTaskClassifier, MultiTaskFormat, SubTaskReferences};
use crate::text::normalize_english;

#[derive(Debug, Default)]
struct BranchTally {
    total: usize,
    follows: usize,
}

#[derive(Debug, Default)]
struct StageTally {
    buckets: BTreeMap<usize, IndexMap<SubTask, VariationTally>>,
    branches: IndexMap<MultiTaskFormat, BranchTally>,
}

impl StageTally {
    fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.branches.is_empty()
    }
}

/// Scorer for the multi-task stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiTaskScorer {
    classifier: MultiTaskClassifier,
}

impl MultiTaskScorer {
    /// Create a scorer with the given transcript thresholds.
    pub fn new(thresholds: ConstrainThresholds) -> Self {
        Self {
            classifier: MultiTaskClassifier::new(thresholds),
        }
    }

    fn tally(&self, samples: &[Sample]) -> IndexMap<&'static str, StageTally> {
        let mut stages: IndexMap<&'static str, StageTally> = STAGES.iter().map(|s| (*s, StageTally::default())).collect();

        for sample in samples {
            let references = SubTaskReferences::from_sample(sample);
            let transcript = normalize_english(&references.transcript);

            for (stage, variations) in sample.stages() {
                let Some(tally) = stages.get_mut(stage) else {
                    debug!(stage, "Ignoring unknown stage");
                    continue;
                };
                for format in MultiTaskFormat::ALL {
                    let records = match format {
                        MultiTaskFormat::Separation => variations.separation_records(),
                        MultiTaskFormat::Json => variations.json_records(),
                    };
                    for record in &records {
                        let judgement = self.classifier.classify(format, record, &references);
                        if judgement.tasks.is_empty() {
                            continue;
                        }

                        let bucket = tally.buckets.entry(judgement.tasks.len()).or_default();
                        for (task, part) in judgement.iter() {
                            let reference = match task {
                                SubTask::Asr => transcript.clone(),
                                _ => references.of(task).to_string(),
                            };
                            bucket
                                .entry(task)
                                .or_default()
                                .push(part.follows, part.payload.clone(), vec![reference]);
                        }

                        let branch = tally.branches.entry(format).or_default();
                        branch.total += 1;
                        branch.follows += usize::from(judgement.all_follow());
                    }
                }
            }
        }
        stages
    }

    fn sub_task_record(task: SubTask, tally: &VariationTally) -> MetricRecord {
        let metric = match task {
            SubTask::Asr => WordErrorRate::corpus(&tally.hypotheses, &tally.references),
            SubTask::Ser | SubTask::Gr => {
                LabelAccuracy::new(task.task(), GoldLabel::Exact).corpus(&tally.hypotheses, &tally.references)
            }
        };
        MetricRecord::new()
            .with(MetricKind::Ifr.key(), tally.ifr())
            .with(task.metric().key(), metric)
            .with("n", tally.total as f64)
            .rounded()
    }

    /// Score every stage of a multi-task metric file.
    ///
    /// Stages without a well-formed record are left out. Only the 2- and
    /// 3-task buckets are reported.
    #[instrument(skip(self, samples), fields(samples = samples.len()))]
    pub fn score(&self, samples: &[Sample]) -> MultiTaskMetrics {
        let mut metrics = MultiTaskMetrics::new();
        for (stage, tally) in self.tally(samples) {
            if tally.is_empty() {
                continue;
            }
            let mut entries = StageMetrics::new();
            for size in BUCKET_SIZES {
                let Some(bucket) = tally.buckets.get(&size) else {
                    continue;
                };
                let records: IndexMap<String, MetricRecord> = SubTask::ALL
                    .iter()
                    .filter_map(|task| bucket.get(task).map(|t| (task.to_string(), Self::sub_task_record(*task, t))))
                    .collect();
                entries.insert(BenchmarkLayout::bucket_for_size(size), StageEntry::Bucket(records));
            }
            for format in MultiTaskFormat::ALL {
                if let Some(branch) = tally.branches.get(&format) {
                    let ifr = MetricValue::finite(100.0 * branch.follows as f64 / branch.total as f64);
                    let record = MetricRecord::new()
                        .with(MetricKind::Ifr.key(), ifr)
                        .with("n", branch.total as f64)
                        .rounded();
                    entries.insert(format.as_str().to_string(), StageEntry::Branch(record));
                }
            }
            debug!(stage, entries = entries.len(), "Stage scored");
            metrics.insert(stage.to_string(), entries);
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<Sample> {
        let first: Sample = serde_json::from_value(json!({
            "text": "Hello world",
            "emotion": "Happy",
            "gender": "Male",
            "instructions": {"variations": {
                "single-stage": {
                    "separation": [[
                        {"task": "ASR|SER", "response": "hello world \\ happy", "separator": "\\"},
                        {"task": "ASR|GR", "response": "hello world", "separator": "\\"}
                    ]],
                    "json": [[
                        {"task": "SER|GR|ASR", "key": "emo|gen|text",
                         "response": "{\"emo\": \"happy\", \"gen\": \"male\", \"text\": \"hello world\"}"}
                    ]]
                },
                "free-form": {"separation": [[{"task": "ASR|SER", "response": "x", "separator": "\\"}]]}
            }}
        }))
        .unwrap();
        vec![first]
    }

    #[test]
    fn test_stage_buckets_and_branches() {
        // Arrange
        let scorer = MultiTaskScorer::default();

        // Act
        let metrics = scorer.score(&samples());

        // Assert
        let stages: Vec<_> = metrics.keys().map(String::as_str).collect();
        assert_eq!(stages, vec!["single-stage"]);
        let stage = &metrics["single-stage"];
        let keys: Vec<_> = stage.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2-TASK", "3-TASK", "separation", "json"]);

        let two = stage["2-TASK"].as_bucket().unwrap();
        let sub: Vec<_> = two.keys().map(String::as_str).collect();
        assert_eq!(sub, vec!["ASR", "SER", "GR"]);
        // the second separation record has one part for two tasks
        assert_eq!(two["ASR"].value("ifr"), Some(50.0));
        assert_eq!(two["ASR"].value("n"), Some(2.0));
        assert_eq!(two["SER"].value("acc"), Some(100.0));
        assert_eq!(two["GR"].value("ifr"), Some(0.0));

        let three = stage["3-TASK"].as_bucket().unwrap();
        assert_eq!(three["GR"].value("acc"), Some(100.0));
        assert_eq!(three["ASR"].value("wer"), Some(0.0));
    }

    #[test]
    fn test_branch_requires_every_part() {
        let metrics = MultiTaskScorer::default().score(&samples());
        let stage = &metrics["single-stage"];
        match &stage["separation"] {
            StageEntry::Branch(record) => {
                assert_eq!(record.value("ifr"), Some(50.0));
                assert_eq!(record.value("n"), Some(2.0));
            }
            other => panic!("unexpected entry {other:?}"),
        }
        match &stage["json"] {
            StageEntry::Branch(record) => assert_eq!(record.value("ifr"), Some(100.0)),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_multitask_transcript_wer() {
        let sample: Sample = serde_json::from_value(json!({
            "text": "Hello world",
            "emotion": "happy",
            "instructions": {"variations": {"single-stage": {"separation": [[
                {"task": "ASR|SER", "response": "hello there\\happy", "separator": "\\"}
            ]]}}}
        }))
        .unwrap();

        let metrics = MultiTaskScorer::default().score(&[sample]);
        let two = metrics["single-stage"]["2-TASK"].as_bucket().unwrap();
        assert_eq!(two["ASR"].value("ifr"), Some(100.0));
        assert_eq!(two["ASR"].value("wer"), Some(50.0));
    }

    #[test]
    fn test_no_records_yields_empty_tree() {
        let sample: Sample = serde_json::from_value(json!({"text": "hi"})).unwrap();
        assert!(MultiTaskScorer::default().score(&[sample]).is_empty());
    }
}
