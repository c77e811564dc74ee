//! Label accuracy for the classification tasks.

use audio_ifeval_domain::{MetricKind, MetricRecord, MetricValue, Task};

use super::CorpusMetric;
use crate::text::canonical_label;

/// How the gold label is read from the reference text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldLabel {
    /// Trimmed, lower-cased reference text
    Exact,
    /// First whole-word label in the reference; items without one are left
    /// out of the denominator
    Canonical,
}

/// Percentage of items whose predicted label equals the gold label. The
/// prediction is the first whole-word label in the payload, so an empty
/// payload is always a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelAccuracy {
    task: Task,
    gold: GoldLabel,
}

impl LabelAccuracy {
    /// Accuracy for a classification task.
    pub fn new(task: Task, gold: GoldLabel) -> Self {
        Self { task, gold }
    }

    fn gold_label(&self, reference: &str) -> Option<String> {
        match self.gold {
            GoldLabel::Exact => Some(reference.trim().to_lowercase()),
            GoldLabel::Canonical => canonical_label(self.task, reference).map(str::to_string),
        }
    }

    /// Accuracy over aligned hypotheses and references.
    pub fn corpus(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricValue {
        let (hits, counted) = hypotheses
            .iter()
            .zip(references)
            .filter_map(|(hyp, refs)| self.gold_label(refs.first()?).map(|gold| (hyp, gold)))
            .fold((0usize, 0usize), |(hits, counted), (hyp, gold)| {
                let hit = canonical_label(self.task, hyp).map_or(false, |pred| pred == gold);
                (hits + usize::from(hit), counted + 1)
            });
        if counted == 0 {
            MetricValue::NotApplicable
        } else {
            MetricValue::finite(100.0 * hits as f64 / counted as f64)
        }
    }
}

impl CorpusMetric for LabelAccuracy {
    fn name(&self) -> &'static str {
        "acc"
    }

    fn compute(&self, hypotheses: &[String], references: &[Vec<String>]) -> MetricRecord {
        MetricRecord::new().with(MetricKind::Acc.key(), self.corpus(hypotheses, references))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    fn refs(xs: &[&str]) -> Vec<Vec<String>> {
        xs.iter().map(|x| vec![x.to_string()]).collect()
    }

    #[test]
    fn test_exact_gold() {
        let acc = LabelAccuracy::new(Task::Ser, GoldLabel::Exact);
        let value = acc.corpus(&strings(&["happy", "", "sad"]), &refs(&["Happy", "sad", "angry"]));
        assert!((value.value().unwrap() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_canonical_gold_skips_unreadable() {
        let acc = LabelAccuracy::new(Task::Gr, GoldLabel::Canonical);
        let value = acc.corpus(
            &strings(&["MALE", "female voice", "male"]),
            &refs(&["The speaker is male", "unknown", "female"]),
        );
        // the second item has no readable gold label
        assert_eq!(value, MetricValue::Value(50.0));
    }

    #[test]
    fn test_no_counted_items_is_not_applicable() {
        let acc = LabelAccuracy::new(Task::Gr, GoldLabel::Canonical);
        assert!(acc.corpus(&strings(&["male"]), &refs(&["?"])).is_not_applicable());
    }
}
