//! Compliance of multi-task (`n`) responses.
//!
//! Structural failures (wrong part count, unparseable JSON, missing keys)
//! reject every part. Past that, each part is judged on its own so one bad
//! part does not cost the other tasks their credit. Parts are judged as
//! written; quotes and brackets are only stripped from accepted payloads.

use audio_ifeval_domain::{ConstrainThresholds, MultiTaskRecord, Sample, SubTask};
use serde_json::Value;

use super::constrain::transcript_complies;
use super::ComplianceResult;
use crate::text::{is_exact_label, normalize_english};

/// How the parts of a multi-task response are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiTaskFormat {
    /// Parts joined by a literal separator
    Separation,
    /// Parts stored under one JSON key per task
    Json,
}

impl MultiTaskFormat {
    /// Both formats in report order.
    pub const ALL: [MultiTaskFormat; 2] = [MultiTaskFormat::Separation, MultiTaskFormat::Json];

    /// Branch name used in instruction records and metric files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Separation => "separation",
            Self::Json => "json",
        }
    }

    /// Parse a branch name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "separation" => Some(Self::Separation),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Ground truth for each sub-task of one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTaskReferences {
    /// Reference transcript
    pub transcript: String,
    /// Emotion label, lower-cased
    pub emotion: String,
    /// Gender label, lower-cased
    pub gender: String,
}

impl SubTaskReferences {
    /// Read references from a sample.
    pub fn from_sample(sample: &Sample) -> Self {
        let label = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_lowercase();
        Self {
            transcript: sample.text.trim().to_string(),
            emotion: label(&sample.emotion),
            gender: label(&sample.gender),
        }
    }

    /// Reference of one sub-task.
    pub fn of(&self, task: SubTask) -> &str {
        match task {
            SubTask::Asr => &self.transcript,
            SubTask::Ser => &self.emotion,
            SubTask::Gr => &self.gender,
        }
    }
}

/// Per-part outcome of one multi-task response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTaskJudgement {
    /// Known tasks requested, in order
    pub tasks: Vec<SubTask>,
    /// One result per task
    pub parts: Vec<ComplianceResult>,
}

impl MultiTaskJudgement {
    fn rejected(tasks: Vec<SubTask>) -> Self {
        let parts = vec![ComplianceResult::rejected(); tasks.len()];
        Self { tasks, parts }
    }

    /// Whether every requested part complies.
    pub fn all_follow(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.follows)
    }

    /// Pairs of task and result.
    pub fn iter(&self) -> impl Iterator<Item = (SubTask, &ComplianceResult)> {
        self.tasks.iter().copied().zip(self.parts.iter())
    }
}

/// Classifier for `separation` and `json` multi-task records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiTaskClassifier {
    thresholds: ConstrainThresholds,
}

impl MultiTaskClassifier {
    /// Create a classifier with the given transcript thresholds.
    pub fn new(thresholds: ConstrainThresholds) -> Self {
        Self { thresholds }
    }

    /// Judge one record.
    pub fn classify(
        &self,
        format: MultiTaskFormat,
        record: &MultiTaskRecord,
        references: &SubTaskReferences,
    ) -> MultiTaskJudgement {
        let tasks = record.tasks();
        let raw_parts = match format {
            MultiTaskFormat::Separation => split_parts(record, tasks.len()),
            MultiTaskFormat::Json => keyed_parts(record, tasks.len()),
        };
        let Some(raw_parts) = raw_parts else {
            return MultiTaskJudgement::rejected(tasks);
        };

        let parts = tasks
            .iter()
            .zip(raw_parts.iter())
            .map(|(task, part)| self.judge_part(*task, part, references.of(*task)))
            .collect();
        MultiTaskJudgement { tasks, parts }
    }

    fn judge_part(&self, task: SubTask, part: &str, reference: &str) -> ComplianceResult {
        match task {
            SubTask::Asr => {
                if transcript_complies(part, reference, &self.thresholds) {
                    ComplianceResult::accepted(normalize_english(&clean_part(part)))
                } else {
                    ComplianceResult::rejected()
                }
            }
            SubTask::Ser | SubTask::Gr => {
                if is_exact_label(task.task(), part) {
                    ComplianceResult::accepted(clean_part(part).to_lowercase())
                } else {
                    ComplianceResult::rejected()
                }
            }
        }
    }
}

fn split_parts(record: &MultiTaskRecord, expected: usize) -> Option<Vec<String>> {
    let separator = record.separator();
    if separator.is_empty() {
        return None;
    }
    let parts: Vec<String> = record.response.split(separator).map(|p| p.trim().to_string()).collect();
    (parts.len() == expected).then_some(parts)
}

fn keyed_parts(record: &MultiTaskRecord, expected: usize) -> Option<Vec<String>> {
    let keys = record.keys();
    if keys.len() != expected {
        return None;
    }
    let parsed: Value = serde_json::from_str(&record.response).ok()?;
    let obj = parsed.as_object()?;
    keys.iter()
        .map(|key| {
            obj.get(key).map(|value| match value {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
        })
        .collect()
}

/// Strip whitespace, quotes and one symmetric bracket pair.
fn clean_part(part: &str) -> String {
    let unquoted = part
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == ' ')
        .trim();
    let mut chars = unquoted.chars();
    let enclosed = match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) => matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}')),
        _ => false,
    };
    if enclosed {
        unquoted[1..unquoted.len() - 1].trim().to_string()
    } else {
        unquoted.to_string()
    }
}
