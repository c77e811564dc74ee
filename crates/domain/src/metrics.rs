//! Metric values, records and the per-model metric tree.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Key of the multi-task sub-tree inside `n`.
pub const MULTITASK_ROOT: &str = "only";

/// A metric outcome. `NotApplicable` is produced for empty inputs and must be
/// treated as absent by every downstream average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// A finite value
    Value(f64),
    /// Nothing to measure
    NotApplicable,
}

impl MetricValue {
    /// Wrap a value, mapping non-finite results to `NotApplicable`.
    pub fn finite(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::NotApplicable
        }
    }

    /// The value, if applicable.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::NotApplicable => None,
        }
    }

    /// Whether this is `NotApplicable`.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    /// Round to `places` decimals.
    pub fn rounded(self, places: u32) -> Self {
        match self {
            Self::Value(v) => Self::Value(round_to(v, places)),
            na => na,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::finite(value)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetricValueVisitor;

        impl<'de> Visitor<'de> for MetricValueVisitor {
            type Value = MetricValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or \"N/A\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MetricValue, E> {
                Ok(MetricValue::finite(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MetricValue, E> {
                Ok(MetricValue::Value(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MetricValue, E> {
                Ok(MetricValue::Value(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MetricValue, E> {
                if v.eq_ignore_ascii_case("n/a") {
                    Ok(MetricValue::NotApplicable)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<MetricValue, E> {
                Ok(MetricValue::NotApplicable)
            }
        }

        deserializer.deserialize_any(MetricValueVisitor)
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Decimal places a metric key is stored with. Caption metrics and the BLEU
/// length statistics keep four, everything else two.
pub fn precision_of(key: &str) -> u32 {
    match key {
        "METEOR" | "CIDEr-D" | "ROUGE-L" | "bp" | "len_ratio" => 4,
        _ => 2,
    }
}

/// Metric key to value for one label, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord(pub IndexMap<String, MetricValue>);

impl MetricRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a metric.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw entry.
    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.0.get(key).copied()
    }

    /// Applicable value for a key.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.value())
    }

    /// Copy with every value rounded to its key's precision.
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.rounded(precision_of(k))))
                .collect(),
        )
    }

    /// Copy with every value replaced by not-applicable.
    pub fn not_applicable(&self) -> Self {
        Self(self.0.keys().map(|k| (k.clone(), MetricValue::NotApplicable)).collect())
    }

    /// Instruction-following rate, if applicable.
    pub fn ifr(&self) -> Option<f64> {
        self.value(crate::task::MetricKind::Ifr.key())
    }

    /// Metric keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether the record has no metrics.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Label (variation or composite) to record, for one task.
pub type TaskMetrics = IndexMap<String, MetricRecord>;

/// One entry of a multi-task stage: a task-count bucket holding per-sub-task
/// records, or a branch-level record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageEntry {
    /// `2-TASK` / `3-TASK`: sub-task name to record
    Bucket(IndexMap<String, MetricRecord>),
    /// `separation` / `json`: branch totals
    Branch(MetricRecord),
}

impl StageEntry {
    /// Sub-task records, when this entry is a bucket.
    pub fn as_bucket(&self) -> Option<&IndexMap<String, MetricRecord>> {
        match self {
            Self::Bucket(b) => Some(b),
            Self::Branch(_) => None,
        }
    }
}

/// Entries of one stage, keyed by bucket or branch name.
pub type StageMetrics = IndexMap<String, StageEntry>;

/// Stage name to stage entries.
pub type MultiTaskMetrics = IndexMap<String, StageMetrics>;

/// Complete metric tree for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Task name to label records, dimension `d`
    #[serde(default)]
    pub d: IndexMap<String, TaskMetrics>,
    /// Task name to label records, dimension `f`
    #[serde(default)]
    pub f: IndexMap<String, TaskMetrics>,
    /// Multi-task results. Entries that are not stage trees are ignored.
    #[serde(default, deserialize_with = "lenient_entries")]
    pub n: IndexMap<String, MultiTaskMetrics>,
}

impl ModelMetrics {
    /// Task tree for a dimension, `None` for `n`.
    pub fn tasks(&self, dimension: crate::task::Dimension) -> Option<&IndexMap<String, TaskMetrics>> {
        match dimension {
            crate::task::Dimension::D => Some(&self.d),
            crate::task::Dimension::F => Some(&self.f),
            crate::task::Dimension::N => None,
        }
    }

    /// Mutable task tree for a dimension, `None` for `n`.
    pub fn tasks_mut(
        &mut self,
        dimension: crate::task::Dimension,
    ) -> Option<&mut IndexMap<String, TaskMetrics>> {
        match dimension {
            crate::task::Dimension::D => Some(&mut self.d),
            crate::task::Dimension::F => Some(&mut self.f),
            crate::task::Dimension::N => None,
        }
    }

    /// Record for (dimension, task, label).
    pub fn record(
        &self,
        dimension: crate::task::Dimension,
        task: crate::task::Task,
        label: &str,
    ) -> Option<&MetricRecord> {
        self.tasks(dimension)?.get(task.as_str())?.get(label)
    }

    /// Sub-task records of a multi-task bucket, e.g. (`single-stage`, `2-TASK`).
    pub fn multitask_bucket(&self, stage: &str, bucket: &str) -> Option<&IndexMap<String, MetricRecord>> {
        self.n.get(MULTITASK_ROOT)?.get(stage)?.get(bucket)?.as_bucket()
    }

    /// Whether the model has any multi-task results.
    pub fn has_multitask(&self) -> bool {
        self.n.contains_key(MULTITASK_ROOT)
    }
}

/// Model name to metric tree, in cohort order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortMetrics(pub IndexMap<String, ModelMetrics>);

impl CohortMetrics {
    /// Model names in order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Add or replace a model, keeping its original position when replaced.
    pub fn insert(&mut self, model: impl Into<String>, metrics: ModelMetrics) {
        self.0.insert(model.into(), metrics);
    }

    /// Metric tree of one model.
    pub fn get(&self, model: &str) -> Option<&ModelMetrics> {
        self.0.get(model)
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cohort is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn lenient_entries<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<IndexMap<String, serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|t| (k, t)))
        .collect())
}
