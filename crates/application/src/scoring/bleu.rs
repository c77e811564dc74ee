//! Corpus BLEU with exponential smoothing and Chinese tokenisation.

use audio_ifeval_domain::{MetricKind, MetricRecord};
use std::collections::HashMap;

use super::tokenize::tokenize_zh;
use super::CorpusMetric;

const MAX_ORDER: usize = 4;

/// Corpus-level BLEU statistics and score.
#[derive(Debug, Clone, PartialEq)]
pub struct BleuScore {
    /// BLEU on the 0-100 scale
    pub score: f64,
    /// Modified n-gram precisions, 0-100
    pub precisions: [f64; MAX_ORDER],
    /// Brevity penalty
    pub brevity_penalty: f64,
    /// Hypothesis token count
    pub sys_len: usize,
    /// Closest-reference token count
    pub ref_len: usize,
}

impl BleuScore {
    /// `sys_len / ref_len`, zero without reference tokens.
    pub fn length_ratio(&self) -> f64 {
        if self.ref_len > 0 {
            self.sys_len as f64 / self.ref_len as f64
        } else {
            0.0
        }
    }
}

fn ngram_counts(tokens: &[String], max_order: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for n in 1..=max_order {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

fn log_precision(p: f64) -> f64 {
    if p == 0.0 {
        -9_999_999_999.0
    } else {
        p.ln()
    }
}

/// Corpus BLEU of hypotheses against one or more references each.
pub fn corpus_bleu(hypotheses: &[String], references: &[Vec<String>]) -> BleuScore {
    let mut correct = [0usize; MAX_ORDER];
    let mut total = [0usize; MAX_ORDER];
    let mut sys_len = 0usize;
    let mut ref_len = 0usize;

    for (hypothesis, refs) in hypotheses.iter().zip(references) {
        let hyp = tokenize_zh(hypothesis);
        let ref_tokens: Vec<Vec<String>> = refs.iter().map(|r| tokenize_zh(r)).collect();

        let mut closest: Option<(usize, usize)> = None;
        let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
        for tokens in &ref_tokens {
            let diff = tokens.len().abs_diff(hyp.len());
            closest = match closest {
                Some((best_diff, best_len)) if diff > best_diff || (diff == best_diff && tokens.len() >= best_len) => {
                    Some((best_diff, best_len))
                }
                _ => Some((diff, tokens.len())),
            };
            for (gram, count) in ngram_counts(tokens, MAX_ORDER) {
                let entry = max_ref_counts.entry(gram).or_insert(0);
                *entry = (*entry).max(count);
            }
        }

        sys_len += hyp.len();
        ref_len += closest.map_or(0, |(_, len)| len);

        for (gram, count) in ngram_counts(&hyp, MAX_ORDER) {
            let n = gram.len() - 1;
            total[n] += count;
            if let Some(max) = max_ref_counts.get(gram) {
                correct[n] += count.min(*max);
            }
        }
    }

    compute_bleu(&correct, &total, sys_len, ref_len)
}

fn compute_bleu(correct: &[usize; MAX_ORDER], total: &[usize; MAX_ORDER], sys_len: usize, ref_len: usize) -> BleuScore {
    let mut precisions = [0.0f64; MAX_ORDER];
    if sys_len == 0 {
        return BleuScore {
            score: 0.0,
            precisions,
            brevity_penalty: 0.0,
            sys_len,
            ref_len,
        };
    }

    let brevity_penalty = if sys_len < ref_len {
        (1.0 - ref_len as f64 / sys_len as f64).exp()
    } else {
        1.0
    };

    let mut smooth = 1.0;
    for n in 0..MAX_ORDER {
        if total[n] == 0 {
            break;
        }
        precisions[n] = if correct[n] == 0 {
            smooth *= 2.0;
            100.0 / (smooth * total[n] as f64)
        } else {
            100.0 * correct[n] as f64 / total[n] as f64
        };
    }

    let mean_log = precisions.iter().map(|p| log_precision(*p)).sum::<f64>() / MAX_ORDER as f64;
    BleuScore {
        score: brevity_penalty * mean_log.exp(),
        precisions,
        brevity_penalty,
        sys_len,
        ref_len,
    }
}

/// Corpus BLEU metric. With `breakdown` it also reports the n-gram
/// precisions, brevity penalty and length ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusBleu {
    /// Report side statistics
    pub breakdown: bool,
}

impl CorpusBleu {
    /// BLEU with side statistics.
    pub fn with_breakdown() -> Self {
        Self { breakdown: true }
    }
}

impl CorpusMetric for CorpusBleu {
    fn name(&self) -> &'static str {
        "bleu"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        let bleu = corpus_bleu(hypotheses, references);
        let mut record = MetricRecord::new().with(MetricKind::Bleu.key(), bleu.score);
        if self.breakdown {
            for (i, p) in bleu.precisions.iter().enumerate() {
                record.insert(format!("p{}", i + 1), *p);
            }
            record.insert("bp", bleu.brevity_penalty);
            record.insert("len_ratio", bleu.length_ratio());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(s: &str) -> Vec<String> {
        vec![s.to_string()]
    }

    #[test]
    fn test_identical_sentence_scores_100() {
        let hyps = one("今天天气很好");
        let score = corpus_bleu(&hyps, &[one("今天天气很好")]);
        assert!((score.score - 100.0).abs() < 1e-9);
        assert_eq!(score.brevity_penalty, 1.0);
        assert_eq!(score.length_ratio(), 1.0);
    }

    #[test]
    fn test_empty_hypothesis_scores_zero() {
        let score = corpus_bleu(&one(""), &[one("今天天气很好")]);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.brevity_penalty, 0.0);
        assert_eq!(score.ref_len, 6);
    }

    #[test]
    fn test_exp_smoothing_for_missing_orders() {
        // Two tokens, no bigram overlap: p2 is smoothed, p3 and p4 have no n-grams.
        let score = corpus_bleu(&one("你 们"), &[one("你 好")]);
        assert_eq!(score.precisions[0], 50.0);
        assert_eq!(score.precisions[1], 50.0);
        assert_eq!(score.precisions[2], 0.0);
        assert!(score.score < 1e-6);
    }

    #[test]
    fn test_closest_reference_prefers_shorter_on_tie() {
        let refs = vec![vec!["一 二".to_string(), "一 二 三 四".to_string()]];
        let score = corpus_bleu(&one("一 二 三"), &refs);
        assert_eq!(score.ref_len, 2);
    }

    #[test]
    fn test_breakdown_keys() {
        let record = CorpusBleu::with_breakdown().compute(&one("好"), &[one("好")]);
        let keys: Vec<_> = record.keys().collect();
        assert_eq!(keys, vec!["bleu", "p1", "p2", "p3", "p4", "bp", "len_ratio"]);
        assert_eq!(CorpusBleu::default().compute(&one("好"), &[one("好")]).keys().count(), 1);
    }
}
