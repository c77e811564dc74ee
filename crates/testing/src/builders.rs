//! Fluent builder pattern for constructing test data.
//!
//! Builders for evaluation samples and per-model metric trees, with a
//! fluent API for customization.

use audio_ifeval_domain::{
    Dimension, Instructions, MetricRecord, MetricValue, ModelMetrics, Sample, StageEntry, StageVariations, SubTask,
    Task, MULTITASK_ROOT,
};
use indexmap::IndexMap;
use serde_json::{json, Value};

/// Builder for creating Sample test instances
#[derive(Clone, Default)]
pub struct SampleBuilder {
    text: String,
    task: Option<String>,
    emotion: Option<String>,
    gender: Option<String>,
    variations: IndexMap<String, Value>,
    stages: IndexMap<String, StageVariations>,
}

impl SampleBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    fn push(&mut self, variation: &str, response: Value) {
        let entry = self
            .variations
            .entry(variation.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(response),
            other => *other = Value::Array(vec![other.take(), response]),
        }
    }

    /// Append a plain response to a variation.
    pub fn with_response(mut self, variation: &str, response: impl Into<String>) -> Self {
        self.push(variation, Value::String(response.into()));
        self
    }

    /// Append a response carrying rule parameters (`prefix`, `suffix`, `lrt`, `key`).
    pub fn with_param_response(mut self, variation: &str, response: impl Into<String>, params: &[(&str, &str)]) -> Self {
        let mut obj = serde_json::Map::new();
        obj.insert("response".into(), Value::String(response.into()));
        for (name, value) in params {
            obj.insert((*name).into(), Value::String((*value).into()));
        }
        self.push(variation, Value::Object(obj));
        self
    }

    /// Set a variation to a raw value, replacing anything appended so far.
    pub fn with_variation(mut self, variation: &str, value: Value) -> Self {
        self.variations.insert(variation.to_string(), value);
        self
    }

    fn stage(&mut self, stage: &str) -> &mut StageVariations {
        self.stages.entry(stage.to_string()).or_default()
    }

    /// Add a `separation` record to a stage, in its own block.
    pub fn with_separation(mut self, stage: &str, tasks: &str, response: &str, separator: &str) -> Self {
        let record = json!({"task": tasks, "response": response, "separator": separator});
        self.stage(stage).separation.push(Value::Array(vec![record]));
        self
    }

    /// Add a `json` record to a stage, in its own block.
    pub fn with_json_record(mut self, stage: &str, tasks: &str, keys: &str, response: &str) -> Self {
        let record = json!({"task": tasks, "key": keys, "response": response});
        self.stage(stage).json.push(Value::Array(vec![record]));
        self
    }

    pub fn build(self) -> Sample {
        let instructions = (!self.stages.is_empty()).then(|| Instructions {
            variations: self.stages,
        });
        Sample {
            text: self.text,
            task: self.task,
            emotion: self.emotion,
            gender: self.gender,
            variation_responses: self.variations,
            instructions,
        }
    }
}

/// Builder for creating per-model metric trees
#[derive(Clone, Default)]
pub struct MetricTreeBuilder {
    metrics: ModelMetrics,
}

impl MetricTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record of a (dimension, task, label). Ignored for `n`.
    pub fn with_record(mut self, dimension: Dimension, task: Task, label: &str, record: MetricRecord) -> Self {
        if let Some(tasks) = self.metrics.tasks_mut(dimension) {
            tasks
                .entry(task.as_str().to_string())
                .or_default()
                .insert(label.to_string(), record);
        }
        self
    }

    /// Set a label to its IFR and the task's primary metric.
    pub fn with_label(
        self,
        dimension: Dimension,
        task: Task,
        label: &str,
        ifr: f64,
        metric: impl Into<MetricValue>,
    ) -> Self {
        let record = MetricRecord::new()
            .with("ifr", ifr)
            .with(task.primary_metric().key(), metric);
        self.with_record(dimension, task, label, record)
    }

    /// Set one sub-task record of a multi-task bucket, e.g. (`single-stage`, `2-TASK`).
    pub fn with_bucket_record(mut self, stage: &str, bucket: &str, sub: SubTask, ifr: f64, metric: f64) -> Self {
        let entries = self
            .metrics
            .n
            .entry(MULTITASK_ROOT.to_string())
            .or_default()
            .entry(stage.to_string())
            .or_default();
        let entry = entries
            .entry(bucket.to_string())
            .or_insert_with(|| StageEntry::Bucket(IndexMap::new()));
        if let StageEntry::Branch(_) = entry {
            *entry = StageEntry::Bucket(IndexMap::new());
        }
        if let StageEntry::Bucket(records) = entry {
            let record = MetricRecord::new()
                .with("ifr", ifr)
                .with(sub.metric().key(), metric)
                .with("n", 10.0);
            records.insert(sub.as_str().to_string(), record);
        }
        self
    }

    pub fn build(self) -> ModelMetrics {
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builder_appends_responses() {
        let sample = SampleBuilder::new("hi")
            .with_response("upper_case", "HI")
            .with_response("upper_case", "Hi")
            .with_param_response("prefix", "Answer: hi", &[("prefix", "Answer:")])
            .build();
        let variations = sample.variations(false);
        assert_eq!(variations[0].1.len(), 2);
        assert_eq!(variations[1].1[0].meta.prefix.as_deref(), Some("Answer:"));
        assert!(sample.instructions.is_none());
    }

    #[test]
    fn test_sample_builder_stages() {
        let sample = SampleBuilder::new("hello")
            .with_separation("single-stage", "ASR|SER", "hello\\HAPPY", "\\")
            .build();
        let (stage, variations) = sample.stages().next().unwrap();
        assert_eq!(stage, "single-stage");
        assert_eq!(variations.separation_records().len(), 1);
    }

    #[test]
    fn test_metric_tree_builder() {
        let metrics = MetricTreeBuilder::new()
            .with_label(Dimension::F, Task::Asr, "json", 80.0, 12.5)
            .with_bucket_record("single-stage", "2-TASK", SubTask::Ser, 90.0, 55.0)
            .build();
        assert_eq!(metrics.record(Dimension::F, Task::Asr, "json").unwrap().value("wer"), Some(12.5));
        assert_eq!(
            metrics.multitask_bucket("single-stage", "2-TASK").unwrap()["SER"].value("acc"),
            Some(55.0)
        );
    }
}
