//! Scoring pipeline for the audio instruction-following benchmark
//!
//! Responses flow through five stages, each consuming only the previous
//! stage's output plus the static [`BenchmarkLayout`] and
//! [`ScoringSettings`](audio_ifeval_domain::ScoringSettings).
//!
//! ## Modules
//!
//! - `compliance` - Per-variation compliance rules and payload extraction
//! - `scoring` - Corpus metrics, the per-variation scorer and the multi-task scorer
//! - `aggregation` - Composite labels and per-model dimension totals
//! - `normalization` - Cross-model rescaling of the primary metrics
//! - `radar` - Polygon areas of the overall vectors
//! - `text` - Text normalisation shared by the classifier and the metrics
//!
//! [`BenchmarkLayout`]: audio_ifeval_domain::BenchmarkLayout

pub mod aggregation;
pub mod compliance;
pub mod normalization;
pub mod radar;
pub mod scoring;
pub mod text;

// Re-export commonly used types
pub use aggregation::{AggregatedCohort, DimensionAggregator, ModelTotals};
pub use compliance::{ComplianceClassifier, ComplianceResult, MultiTaskClassifier, RuleTable, VariationRule};
pub use normalization::{CrossModelNormalizer, ModelScores, NormalizedCohort};
pub use radar::{area_ratio, polygon_area, radar_vector, RadarAreaScorer, RadarScale};
pub use scoring::{CorpusMetric, MetricScorer, MultiTaskScorer, VariationTally};

use audio_ifeval_domain::{Dimension, Task};
use thiserror::Error;

/// Errors raised while scoring a metric file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// A variation key was present but held no responses
    #[error("No response in {variation}!")]
    EmptyVariation {
        /// Variation name
        variation: String,
    },

    /// No metric suite is registered for the pair
    #[error("No metric suite for {dimension}/{task}")]
    MissingSuite {
        /// Dimension scored
        dimension: Dimension,
        /// Task scored
        task: Task,
    },
}

impl ScoringError {
    /// Get error code for reports
    pub fn error_code(&self) -> &'static str {
        match self {
            ScoringError::EmptyVariation { .. } => "EMPTY_VARIATION",
            ScoringError::MissingSuite { .. } => "MISSING_SUITE",
        }
    }
}

/// Errors raised by the radar area computation
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RadarError {
    /// Rescaling was requested against a zero maximum
    #[error("Max value for normalizing is 0")]
    ZeroMaxValue,

    /// The reference polygon has no area
    #[error("Reference polygon area is 0")]
    ZeroReferenceArea,
}

impl RadarError {
    /// Get error code for reports
    pub fn error_code(&self) -> &'static str {
        match self {
            RadarError::ZeroMaxValue => "ZERO_MAX_VALUE",
            RadarError::ZeroReferenceArea => "ZERO_REFERENCE_AREA",
        }
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let empty = ScoringError::EmptyVariation {
            variation: "wrap".to_string(),
        };
        assert_eq!(empty.error_code(), "EMPTY_VARIATION");
        assert_eq!(empty.to_string(), "No response in wrap!");

        let missing = ScoringError::MissingSuite {
            dimension: Dimension::N,
            task: Task::Asr,
        };
        assert_eq!(missing.error_code(), "MISSING_SUITE");
        assert_eq!(missing.to_string(), "No metric suite for n/asr");

        assert_eq!(RadarError::ZeroMaxValue.error_code(), "ZERO_MAX_VALUE");
        assert_eq!(RadarError::ZeroReferenceArea.error_code(), "ZERO_REFERENCE_AREA");
    }
}
