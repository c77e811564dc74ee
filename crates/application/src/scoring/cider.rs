//! CIDEr-D: tf-idf weighted n-gram similarity with clipping and a Gaussian
//! length penalty. Document frequencies come from the references of the
//! corpus being scored.

use audio_ifeval_domain::{MetricKind, MetricRecord, MetricValue};
use std::collections::{HashMap, HashSet};

use super::tokenize::tokenize_caption;
use super::CorpusMetric;

type NgramCounts = HashMap<Vec<String>, f64>;

fn ngram_counts(tokens: &[String], max_order: usize) -> NgramCounts {
    let mut counts = HashMap::new();
    for n in 1..=max_order {
        for gram in tokens.windows(n) {
            *counts.entry(gram.to_vec()).or_insert(0.0) += 1.0;
        }
    }
    counts
}

struct TfIdfVector {
    weights: Vec<HashMap<Vec<String>, f64>>,
    norms: Vec<f64>,
    /// Bigram count, used as the length for the penalty
    length: f64,
}

/// CIDEr-D parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CiderD {
    /// Largest n-gram order
    pub max_order: usize,
    /// Length penalty deviation
    pub sigma: f64,
}

impl Default for CiderD {
    fn default() -> Self {
        Self {
            max_order: 4,
            sigma: 6.0,
        }
    }
}

impl CiderD {
    fn vectorize(&self, counts: &NgramCounts, doc_freq: &HashMap<Vec<String>, f64>, log_corpus: f64) -> TfIdfVector {
        let mut weights = vec![HashMap::new(); self.max_order];
        let mut norms = vec![0.0; self.max_order];
        let mut length = 0.0;
        for (gram, tf) in counts {
            let n = gram.len() - 1;
            let df = doc_freq.get(gram).copied().unwrap_or(0.0).max(1.0).ln();
            let weight = tf * (log_corpus - df);
            norms[n] += weight * weight;
            weights[n].insert(gram.clone(), weight);
            if n == 1 {
                length += tf;
            }
        }
        TfIdfVector {
            weights,
            norms: norms.into_iter().map(f64::sqrt).collect(),
            length,
        }
    }

    fn similarity(&self, hyp: &TfIdfVector, reference: &TfIdfVector) -> Vec<f64> {
        let delta = hyp.length - reference.length;
        let penalty = (-(delta * delta) / (2.0 * self.sigma * self.sigma)).exp();
        (0..self.max_order)
            .map(|n| {
                let mut value: f64 = hyp.weights[n]
                    .iter()
                    .map(|(gram, w)| {
                        let r = reference.weights[n].get(gram).copied().unwrap_or(0.0);
                        w.min(r) * r
                    })
                    .sum();
                if hyp.norms[n] != 0.0 && reference.norms[n] != 0.0 {
                    value /= hyp.norms[n] * reference.norms[n];
                }
                value * penalty
            })
            .collect()
    }

    /// Per-item scores.
    pub fn segment_scores(&self, hypotheses: &[String], references: &[Vec<String>]) -> Vec<f64> {
        let hyp_counts: Vec<NgramCounts> = hypotheses
            .iter()
            .map(|h| ngram_counts(&tokenize_caption(h), self.max_order))
            .collect();
        let ref_counts: Vec<Vec<NgramCounts>> = references
            .iter()
            .map(|refs| {
                refs.iter()
                    .map(|r| ngram_counts(&tokenize_caption(r), self.max_order))
                    .collect()
            })
            .collect();

        let mut doc_freq: HashMap<Vec<String>, f64> = HashMap::new();
        for refs in &ref_counts {
            let grams: HashSet<&Vec<String>> = refs.iter().flat_map(|r| r.keys()).collect();
            for gram in grams {
                *doc_freq.entry(gram.clone()).or_insert(0.0) += 1.0;
            }
        }
        let log_corpus = (ref_counts.len() as f64).ln();

        hyp_counts
            .iter()
            .zip(&ref_counts)
            .map(|(hyp, refs)| {
                if refs.is_empty() {
                    return 0.0;
                }
                let hyp_vec = self.vectorize(hyp, &doc_freq, log_corpus);
                let mut sums = vec![0.0; self.max_order];
                for reference in refs {
                    let ref_vec = self.vectorize(reference, &doc_freq, log_corpus);
                    for (acc, v) in sums.iter_mut().zip(self.similarity(&hyp_vec, &ref_vec)) {
                        *acc += v;
                    }
                }
                let mean = sums.iter().sum::<f64>() / self.max_order as f64;
                mean / refs.len() as f64 * 10.0
            })
            .collect()
    }

    /// Corpus CIDEr-D: mean of the per-item scores.
    pub fn corpus(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricValue {
        let scores = self.segment_scores(hypotheses, references);
        if scores.is_empty() {
            MetricValue::NotApplicable
        } else {
            MetricValue::finite(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

impl CorpusMetric for CiderD {
    fn name(&self) -> &'static str {
        "cider_d"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        MetricRecord::new().with(MetricKind::CiderD.key(), self.corpus(hypotheses, references))
    }
}
