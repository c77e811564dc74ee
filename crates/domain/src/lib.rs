//! Audio IFEval Domain Types
//!
//! This crate provides the data model shared by every stage of the
//! instruction-following evaluation: tasks and dimensions, input samples,
//! metric values and metric trees, and the static benchmark layout.
//!
//! ## Architecture
//!
//! - **task**: Tasks, dimensions, multi-task sub-tasks and metric kinds
//! - **sample**: Input samples and response flattening
//! - **metrics**: `MetricValue`, `MetricRecord` and per-model metric trees
//! - **layout**: Canonical labels, composite rules and scoring settings
//! - **errors**: Domain error types
//!
//! ## Usage
//!
//! ```rust
//! use audio_ifeval_domain::{BenchmarkLayout, MetricKind, Task};
//!
//! let layout = BenchmarkLayout::standard();
//! assert_eq!(layout.overall_labels().len(), 11);
//! assert_eq!(Task::Asr.primary_metric(), MetricKind::Wer);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod layout;
pub mod metrics;
pub mod sample;
pub mod task;

pub use errors::{DomainError, DomainResult};
pub use layout::{
    BenchmarkLayout, CompositeRule, ConstrainThresholds, DimensionLayout, ScoringSettings, BUCKET_SIZES, MULTI_STAGE, SINGLE_STAGE, STAGES,
};
pub use metrics::{
    precision_of, round_to, CohortMetrics, MetricRecord, MetricValue, ModelMetrics, MultiTaskMetrics, StageEntry,
    StageMetrics, TaskMetrics, MULTITASK_ROOT,
};
pub use sample::{flatten_responses, Instructions, MultiTaskRecord, ResponseItem, ResponseMeta, Sample, StageVariations};
pub use task::{Dimension, Direction, MetricKind, SubTask, Task};
