//! ROUGE-L.

use audio_ifeval_domain::{MetricKind, MetricRecord, MetricValue};

use super::tokenize::tokenize_caption;
use super::CorpusMetric;

/// Longest common subsequence length.
pub fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y { diagonal + 1 } else { above.max(row[j]) };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// LCS F-measure using the best precision and best recall over references.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RougeL {
    /// Recall weight
    pub beta: f64,
}

impl Default for RougeL {
    fn default() -> Self {
        Self { beta: 1.2 }
    }
}

impl RougeL {
    /// Score of one hypothesis.
    pub fn segment(&self, hypothesis: &[String], references: &[Vec<String>]) -> f64 {
        if hypothesis.is_empty() {
            return 0.0;
        }
        let (precision, recall) = references
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| {
                let lcs = lcs_len(r, hypothesis) as f64;
                (lcs / hypothesis.len() as f64, lcs / r.len() as f64)
            })
            .fold((0.0f64, 0.0f64), |(p, r), (p2, r2)| (p.max(p2), r.max(r2)));
        if precision == 0.0 || recall == 0.0 {
            return 0.0;
        }
        let b2 = self.beta * self.beta;
        (1.0 + b2) * precision * recall / (recall + b2 * precision)
    }

    /// Corpus ROUGE-L: mean of segment scores.
    pub fn corpus(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricValue {
        if hypotheses.is_empty() {
            return MetricValue::NotApplicable;
        }
        let total: f64 = hypotheses
            .iter()
            .zip(references)
            .map(|(hyp, refs)| {
                let refs: Vec<Vec<String>> = refs.iter().map(|r| tokenize_caption(r)).collect();
                self.segment(&tokenize_caption(hyp), &refs)
            })
            .sum();
        MetricValue::finite(total / hypotheses.len() as f64)
    }
}

impl CorpusMetric for RougeL {
    fn name(&self) -> &'static str {
        "rouge_l"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        MetricRecord::new().with(MetricKind::RougeL.key(), self.corpus(hypotheses, references))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize_caption(s)
    }

    #[test]
    fn test_lcs() {
        assert_eq!(lcs_len(&toks("a b c d"), &toks("a c d")), 3);
        assert_eq!(lcs_len(&toks("a b"), &toks("c d")), 0);
        assert_eq!(lcs_len(&[], &toks("a")), 0);
    }

    #[test]
    fn test_identical_segment_is_one() {
        let score = RougeL::default().segment(&toks("a dog barks"), &[toks("a dog barks")]);
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_best_precision_and_recall_are_combined() {
        let rouge = RougeL::default();
        let score = rouge.segment(&toks("a dog"), &[toks("a dog barks loudly"), toks("a")]);
        // precision 1.0 from the first, recall 1.0 from the second
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_corpus_mean() {
        let hyps = vec!["a dog".to_string(), String::new()];
        let refs = vec![vec!["a dog".to_string()], vec!["rain".to_string()]];
        assert_eq!(RougeL::default().corpus(&hyps, &refs), MetricValue::Value(0.5));
    }
}
