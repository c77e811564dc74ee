//! Corpus word error rate.

use audio_ifeval_domain::{MetricKind, MetricRecord, MetricValue};

use super::CorpusMetric;

/// Word-level Levenshtein distance.
pub fn word_edit_distance(reference: &[&str], hypothesis: &[&str]) -> usize {
    let mut previous: Vec<usize> = (0..=hypothesis.len()).collect();
    let mut current = vec![0usize; hypothesis.len() + 1];
    for (i, r) in reference.iter().enumerate() {
        current[0] = i + 1;
        for (j, h) in hypothesis.iter().enumerate() {
            let substitution = previous[j] + usize::from(r != h);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[hypothesis.len()]
}

/// Total word edits over total reference words, as a percentage. Only the
/// first reference of each item is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordErrorRate;

impl WordErrorRate {
    /// Corpus WER; not applicable when the references hold no words.
    pub fn corpus(hypotheses: &[String], references: &[Vec<String>]) -> MetricValue {
        let (edits, words) = hypotheses
            .iter()
            .zip(references)
            .fold((0usize, 0usize), |(edits, words), (hyp, refs)| {
                let reference: Vec<&str> = refs.first().map_or_else(Vec::new, |r| r.split_whitespace().collect());
                let hypothesis: Vec<&str> = hyp.split_whitespace().collect();
                (edits + word_edit_distance(&reference, &hypothesis), words + reference.len())
            });
        if words == 0 {
            MetricValue::NotApplicable
        } else {
            MetricValue::finite(100.0 * edits as f64 / words as f64)
        }
    }
}

impl CorpusMetric for WordErrorRate {
    fn name(&self) -> &'static str {
        "wer"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        MetricRecord::new().with(MetricKind::Wer.key(), Self::corpus(hypotheses, references))
    }
}
