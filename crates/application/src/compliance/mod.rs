//! Compliance classification: decides whether a response obeys its variation
//! and extracts the payload that gets scored.
//!
//! Each variation maps to a [`VariationRule`] in a [`RuleTable`]. The table
//! is built once per (dimension, task) and never consulted by name chains.
//! After a rule accepts, a [`PayloadPolicy`] turns the extracted body into
//! the task's scoring form.

pub mod constrain;
pub mod multitask;
pub mod rules;

use audio_ifeval_domain::{ConstrainThresholds, Dimension, ResponseItem, Task};
use std::collections::HashMap;

pub use multitask::{MultiTaskClassifier, MultiTaskFormat, MultiTaskJudgement, SubTaskReferences};
pub use rules::AnswerFormat;

use crate::text::{has_cjk, normalize_english};

/// Outcome for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceResult {
    /// Whether the response obeys its variation
    pub follows: bool,
    /// Scoring payload; empty unless `follows`
    pub payload: String,
}

impl ComplianceResult {
    /// Non-compliant, empty payload.
    pub fn rejected() -> Self {
        Self::default()
    }

    /// Compliant with `payload`. An empty payload cannot claim credit and is
    /// reported as non-compliant.
    pub fn accepted(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        if payload.is_empty() {
            Self::rejected()
        } else {
            Self { follows: true, payload }
        }
    }
}

/// Task-specific heuristic behind the `constrain` variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrainCheck {
    /// Denylist, self-loop and distance to the reference transcript
    Transcript,
    /// Caption denylist and self-loop
    Caption,
    /// A single upper-cased label token
    Label(Task),
    /// Translation marker and leftover-English checks
    Translation,
}

impl ConstrainCheck {
    /// Check for a task.
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Asr => Self::Transcript,
            Task::Aac => Self::Caption,
            Task::S2tt => Self::Translation,
            Task::Ser | Task::Gr => Self::Label(task),
        }
    }

    fn extract(&self, response: &str, reference: &str, thresholds: &ConstrainThresholds) -> Option<String> {
        let ok = match self {
            Self::Transcript => constrain::transcript_complies(response, reference, thresholds),
            Self::Caption => constrain::caption_complies(response),
            Self::Translation => constrain::translation_complies(reference, response),
            Self::Label(task) => return constrain::bare_label(*task, response),
        };
        ok.then(|| response.trim().to_string())
    }
}

/// Compliance rule attached to a variation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationRule {
    /// Only upper-case letters
    UpperCase,
    /// Only lower-case letters
    LowerCase,
    /// Starts with the response's `prefix` parameter
    Prefix,
    /// Ends with the response's `suffix` parameter
    Suffix,
    /// Enclosed by the response's `lrt` parameter
    Wrap,
    /// Strict JSON, optionally keyed by the response's `key` parameter
    Json,
    /// Task heuristic
    Constrain(ConstrainCheck),
    /// Task answer format shared by every `d` variation
    TaskAnswer(AnswerFormat),
}

impl VariationRule {
    /// Extract the raw body of a compliant response.
    pub fn extract(&self, item: &ResponseItem, reference: &str, thresholds: &ConstrainThresholds) -> Option<String> {
        let response = item.text.as_str();
        match self {
            Self::UpperCase => rules::upper_case(response),
            Self::LowerCase => rules::lower_case(response),
            Self::Prefix => rules::prefix(&item.meta, response),
            Self::Suffix => rules::suffix(&item.meta, response),
            Self::Wrap => rules::wrap(&item.meta, response),
            Self::Json => rules::json(&item.meta, response),
            Self::Constrain(check) => check.extract(response, reference, thresholds),
            Self::TaskAnswer(format) => format.extract(response),
        }
    }
}

/// Turns an extracted body into the task's scoring payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPolicy {
    /// English text normaliser
    Transcript,
    /// Trimmed label text
    Label,
    /// Trimmed text; optionally CJK is required
    Translation {
        /// Reject payloads without CJK characters
        require_cjk: bool,
    },
    /// Trimmed caption
    Caption,
}

impl PayloadPolicy {
    /// Policy for a (dimension, task) pair.
    pub fn for_task(dimension: Dimension, task: Task) -> Self {
        match task {
            Task::Asr => Self::Transcript,
            Task::Ser | Task::Gr => Self::Label,
            Task::S2tt => Self::Translation {
                require_cjk: dimension == Dimension::F,
            },
            Task::Aac => Self::Caption,
        }
    }

    /// Apply to a body.
    pub fn apply(&self, body: &str) -> ComplianceResult {
        match self {
            Self::Transcript => ComplianceResult::accepted(normalize_english(body)),
            Self::Label | Self::Caption => ComplianceResult::accepted(body.trim()),
            Self::Translation { require_cjk } => {
                if *require_cjk && !has_cjk(body) {
                    ComplianceResult::rejected()
                } else {
                    ComplianceResult::accepted(body.trim())
                }
            }
        }
    }

    /// Same transformation for a reference text.
    pub fn normalize_reference(&self, reference: &str) -> String {
        match self {
            Self::Transcript => normalize_english(reference),
            _ => reference.trim().to_string(),
        }
    }
}

/// Variation name → rule, with an optional rule for unlisted names.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, VariationRule>,
    fallback: Option<VariationRule>,
}

impl RuleTable {
    /// Empty table; every variation is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a (dimension, task) pair.
    pub fn for_task(dimension: Dimension, task: Task) -> Self {
        let mut table = Self::new();
        match dimension {
            Dimension::D => table.fallback = Some(VariationRule::TaskAnswer(AnswerFormat::for_task(task))),
            Dimension::F => {
                table.register("upper_case", VariationRule::UpperCase);
                table.register("lower_case", VariationRule::LowerCase);
                table.register("prefix", VariationRule::Prefix);
                table.register("suffix", VariationRule::Suffix);
                table.register("wrap", VariationRule::Wrap);
                table.register("json", VariationRule::Json);
                table.register("constrain", VariationRule::Constrain(ConstrainCheck::for_task(task)));
            }
            Dimension::N => {}
        }
        table
    }

    /// Register or replace a rule.
    pub fn register(&mut self, name: &str, rule: VariationRule) {
        self.rules.insert(name.to_string(), rule);
    }

    /// Rule for a variation.
    pub fn rule(&self, variation: &str) -> Option<VariationRule> {
        self.rules.get(variation).copied().or(self.fallback)
    }
}

/// Classifier for one (dimension, task) pair.
#[derive(Debug, Clone)]
pub struct ComplianceClassifier {
    dimension: Dimension,
    task: Task,
    table: RuleTable,
    policy: PayloadPolicy,
    thresholds: ConstrainThresholds,
}

impl ComplianceClassifier {
    /// Build the standard classifier.
    pub fn for_task(dimension: Dimension, task: Task, thresholds: ConstrainThresholds) -> Self {
        Self {
            dimension,
            task,
            table: RuleTable::for_task(dimension, task),
            policy: PayloadPolicy::for_task(dimension, task),
            thresholds,
        }
    }

    /// Replace the rule table.
    pub fn with_table(mut self, table: RuleTable) -> Self {
        self.table = table;
        self
    }

    /// Dimension classified.
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Task classified.
    pub fn task(&self) -> Task {
        self.task
    }

    /// Payload policy in use.
    pub fn policy(&self) -> PayloadPolicy {
        self.policy
    }

    /// Classify one response. Unknown variations are non-compliant.
    pub fn classify(&self, variation: &str, item: &ResponseItem, reference: &str) -> ComplianceResult {
        self.table
            .rule(variation)
            .and_then(|rule| rule.extract(item, reference, &self.thresholds))
            .map_or_else(ComplianceResult::rejected, |body| self.policy.apply(&body))
    }
}
