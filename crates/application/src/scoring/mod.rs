//! Scoring module - corpus metrics and the per-variation scorer
//!
//! Compliant payloads and the empty payloads of non-compliant responses are
//! scored together against their references. Every metric here is computed
//! once over the whole list of a label, never averaged per sample.

mod accuracy;
mod bleu;
mod cider;
mod engine;
mod meteor;
mod multitask;
mod rouge;
pub mod tokenize;
mod wer;

pub use accuracy::{GoldLabel, LabelAccuracy};
pub use bleu::{corpus_bleu, BleuScore, CorpusBleu};
pub use cider::CiderD;
pub use engine::{MetricScorer, VariationTally, ALL_LABEL};
pub use meteor::{align as meteor_align, Meteor, MeteorStats};
pub use multitask::MultiTaskScorer;
pub use rouge::{lcs_len, RougeL};
pub use wer::{word_edit_distance, WordErrorRate};

use audio_ifeval_domain::MetricRecord;

/// A text metric over a corpus of hypotheses, each with one or more
/// references. Returns unrounded values keyed by metric name.
pub trait CorpusMetric: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Compute over aligned hypotheses and references.
    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord;
}
