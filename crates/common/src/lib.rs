//! Common utilities shared by the evaluation crates.
//!
//! This crate provides:
//! - Configuration management
//! - Tracing initialisation
//! - JSON output helpers

pub mod config;
pub mod serialization;
pub mod telemetry;

pub use config::{CohortConfig, ConstrainConfig, EvalConfig, ScoringConfig, TelemetryConfig};
pub use serialization::{to_pretty_json, to_pretty_json_line};
pub use telemetry::init_tracing;

/// Common error type used throughout the crate
pub type Result<T> = std::result::Result<T, anyhow::Error>;
