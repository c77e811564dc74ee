//! Exact-match METEOR, aggregated at corpus level.

use audio_ifeval_domain::{MetricKind, MetricRecord, MetricValue};

use super::tokenize::tokenize_caption;
use super::CorpusMetric;

/// Alignment statistics of one hypothesis against one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeteorStats {
    /// Hypothesis length
    pub hyp_len: usize,
    /// Reference length
    pub ref_len: usize,
    /// Aligned unigrams
    pub matches: usize,
    /// Runs of contiguous aligned unigrams
    pub chunks: usize,
}

/// METEOR parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meteor {
    /// Precision/recall weight
    pub alpha: f64,
    /// Fragmentation exponent
    pub beta: f64,
    /// Fragmentation weight
    pub gamma: f64,
}

impl Default for Meteor {
    fn default() -> Self {
        Self {
            alpha: 0.9,
            beta: 3.0,
            gamma: 0.5,
        }
    }
}

/// Align hypothesis tokens to reference tokens by exact match. A token
/// continues the current chunk when the next reference position matches.
pub fn align(hypothesis: &[String], reference: &[String]) -> MeteorStats {
    let mut used = vec![false; reference.len()];
    let mut previous: Option<usize> = None;
    let mut matches = 0;
    let mut chunks = 0;

    for token in hypothesis {
        let continuing = previous
            .map(|p| p + 1)
            .filter(|&j| j < reference.len() && !used[j] && reference[j] == *token);
        let position = continuing.or_else(|| (0..reference.len()).find(|&j| !used[j] && reference[j] == *token));
        match position {
            Some(j) => {
                used[j] = true;
                matches += 1;
                if continuing.is_none() {
                    chunks += 1;
                }
                previous = Some(j);
            }
            None => previous = None,
        }
    }

    MeteorStats {
        hyp_len: hypothesis.len(),
        ref_len: reference.len(),
        matches,
        chunks,
    }
}

impl Meteor {
    /// Score of aggregated statistics.
    pub fn score(&self, stats: &MeteorStats) -> f64 {
        if stats.matches == 0 || stats.hyp_len == 0 || stats.ref_len == 0 {
            return 0.0;
        }
        let precision = stats.matches as f64 / stats.hyp_len as f64;
        let recall = stats.matches as f64 / stats.ref_len as f64;
        let fmean = precision * recall / (self.alpha * precision + (1.0 - self.alpha) * recall);
        let fragmentation = stats.chunks as f64 / stats.matches as f64;
        let penalty = self.gamma * fragmentation.powf(self.beta);
        fmean * (1.0 - penalty)
    }

    /// Statistics of the best-scoring reference for one hypothesis.
    pub fn best_alignment(&self, hypothesis: &[String], references: &[Vec<String>]) -> MeteorStats {
        references
            .iter()
            .map(|reference| align(hypothesis, reference))
            .fold(None, |best: Option<(f64, MeteorStats)>, stats| {
                let score = self.score(&stats);
                match best {
                    Some((best_score, _)) if best_score >= score => best,
                    _ => Some((score, stats)),
                }
            })
            .map(|(_, stats)| stats)
            .unwrap_or_default()
    }

    /// Corpus METEOR: per-segment best alignments summed, then scored once.
    pub fn corpus(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricValue {
        if hypotheses.is_empty() {
            return MetricValue::NotApplicable;
        }
        let total = hypotheses
            .iter()
            .zip(references)
            .fold(MeteorStats::default(), |acc, (hyp, refs)| {
                let hyp = tokenize_caption(hyp);
                let refs: Vec<Vec<String>> = refs.iter().map(|r| tokenize_caption(r)).collect();
                let stats = self.best_alignment(&hyp, &refs);
                MeteorStats {
                    hyp_len: acc.hyp_len + stats.hyp_len,
                    ref_len: acc.ref_len + stats.ref_len,
                    matches: acc.matches + stats.matches,
                    chunks: acc.chunks + stats.chunks,
                }
            });
        MetricValue::finite(self.score(&total))
    }
}

impl CorpusMetric for Meteor {
    fn name(&self) -> &'static str {
        "meteor"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        MetricRecord::new().with(MetricKind::Meteor.key(), self.corpus(hypotheses, references))
    }
}
