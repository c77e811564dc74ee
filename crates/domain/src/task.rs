//! Tasks, evaluation dimensions and metric kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

/// Audio understanding task a response was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Automatic speech recognition
    Asr,
    /// Gender recognition
    Gr,
    /// Speech emotion recognition
    Ser,
    /// Speech-to-text translation
    S2tt,
    /// Automated audio captioning
    Aac,
}

impl Task {
    /// All tasks in canonical report order.
    pub const ALL: [Task; 5] = [Task::Asr, Task::Gr, Task::Ser, Task::S2tt, Task::Aac];

    /// Lowercase identifier used in file paths and JSON keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asr => "asr",
            Self::Gr => "gr",
            Self::Ser => "ser",
            Self::S2tt => "s2tt",
            Self::Aac => "aac",
        }
    }

    /// The metric that represents this task downstream.
    pub fn primary_metric(&self) -> MetricKind {
        match self {
            Self::Asr => MetricKind::Wer,
            Self::Gr | Self::Ser => MetricKind::Acc,
            Self::S2tt => MetricKind::Bleu,
            Self::Aac => MetricKind::Meteor,
        }
    }

    /// Fixed label set for classification tasks.
    pub fn label_set(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Ser => Some(&["happy", "sad", "angry", "neutral"]),
            Self::Gr => Some(&["male", "female"]),
            _ => None,
        }
    }

    /// Whether references for this task may hold several `|`-separated alternatives.
    pub fn has_multiple_references(&self) -> bool {
        matches!(self, Self::S2tt | Self::Aac)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asr" => Ok(Self::Asr),
            "gr" => Ok(Self::Gr),
            "ser" => Ok(Self::Ser),
            "s2tt" => Ok(Self::S2tt),
            "aac" => Ok(Self::Aac),
            other => Err(DomainError::UnknownTask(other.to_string())),
        }
    }
}

/// Evaluation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Semantic-preserving instruction perturbations
    D,
    /// Output format constraints
    F,
    /// Multi-task composition
    N,
}

impl Dimension {
    /// Lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D => "d",
            Self::F => "f",
            Self::N => "n",
        }
    }

    /// Prefix used for this dimension's keys in the overall record.
    pub fn overall_prefix(&self) -> &'static str {
        match self {
            Self::D => "D",
            Self::F => "F",
            Self::N => "N",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" => Ok(Self::D),
            "f" => Ok(Self::F),
            "n" => Ok(Self::N),
            other => Err(DomainError::UnknownDimension(other.to_string())),
        }
    }
}

/// Sub-task inside a multi-task (`n`) instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubTask {
    /// Transcription part
    Asr,
    /// Emotion label part
    Ser,
    /// Gender label part
    Gr,
}

impl SubTask {
    /// Report order.
    pub const ALL: [SubTask; 3] = [SubTask::Asr, SubTask::Ser, SubTask::Gr];

    /// Uppercase identifier as it appears in instruction records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asr => "ASR",
            Self::Ser => "SER",
            Self::Gr => "GR",
        }
    }

    /// Parse one entry of a `"ASR|SER"` style task list; unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "ASR" => Some(Self::Asr),
            "SER" => Some(Self::Ser),
            "GR" => Some(Self::Gr),
            _ => None,
        }
    }

    /// The single-task equivalent.
    pub fn task(&self) -> Task {
        match self {
            Self::Asr => Task::Asr,
            Self::Ser => Task::Ser,
            Self::Gr => Task::Gr,
        }
    }

    /// Metric reported for this part.
    pub fn metric(&self) -> MetricKind {
        self.task().primary_metric()
    }
}

impl fmt::Display for SubTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether larger values of a metric are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger is better
    HigherIsBetter,
    /// Smaller is better
    LowerIsBetter,
}

/// Metric identifiers as they appear in metric files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Instruction-following rate, percent
    #[serde(rename = "ifr")]
    Ifr,
    /// Word error rate, percent
    #[serde(rename = "wer")]
    Wer,
    /// Label accuracy, percent
    #[serde(rename = "acc")]
    Acc,
    /// Corpus BLEU
    #[serde(rename = "bleu")]
    Bleu,
    /// METEOR
    #[serde(rename = "METEOR")]
    Meteor,
    /// CIDEr-D
    #[serde(rename = "CIDEr-D")]
    CiderD,
    /// ROUGE-L
    #[serde(rename = "ROUGE-L")]
    RougeL,
}

impl MetricKind {
    /// Key used in metric records.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ifr => "ifr",
            Self::Wer => "wer",
            Self::Acc => "acc",
            Self::Bleu => "bleu",
            Self::Meteor => "METEOR",
            Self::CiderD => "CIDEr-D",
            Self::RougeL => "ROUGE-L",
        }
    }

    /// Direction used by cross-model normalisation.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Wer => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }

    /// Decimal places this metric is stored with.
    pub fn precision(&self) -> u32 {
        match self {
            Self::Meteor | Self::CiderD | Self::RougeL => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_str() {
        assert_eq!("ASR".parse::<Task>().unwrap(), Task::Asr);
        assert_eq!(" s2tt ".parse::<Task>().unwrap(), Task::S2tt);
        assert!("speech".parse::<Task>().is_err());
    }

    #[test]
    fn test_primary_metrics() {
        assert_eq!(Task::Asr.primary_metric(), MetricKind::Wer);
        assert_eq!(Task::Ser.primary_metric(), MetricKind::Acc);
        assert_eq!(Task::Gr.primary_metric(), MetricKind::Acc);
        assert_eq!(Task::S2tt.primary_metric(), MetricKind::Bleu);
        assert_eq!(Task::Aac.primary_metric(), MetricKind::Meteor);
    }

    #[test]
    fn test_metric_directions() {
        assert_eq!(MetricKind::Wer.direction(), Direction::LowerIsBetter);
        assert_eq!(MetricKind::Bleu.direction(), Direction::HigherIsBetter);
        assert_eq!(MetricKind::Ifr.direction(), Direction::HigherIsBetter);
    }

    #[test]
    fn test_task_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Task::S2tt).unwrap(), "\"s2tt\"");
        assert_eq!(serde_json::to_string(&SubTask::Gr).unwrap(), "\"GR\"");
        assert_eq!(serde_json::to_string(&MetricKind::CiderD).unwrap(), "\"CIDEr-D\"");
    }

    #[test]
    fn test_subtask_parse() {
        assert_eq!(SubTask::parse(" ASR"), Some(SubTask::Asr));
        assert_eq!(SubTask::parse("asr"), None);
        assert_eq!(SubTask::parse("AAC"), None);
    }
}
