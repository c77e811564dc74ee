//! Testing utilities for the audio instruction-following benchmark
//!
//! This crate provides:
//! - Builders for samples and per-model metric trees
//! - Fixtures for complete metric trees and small cohorts
//! - Random sentences and label draws for property tests
//!
//! # Examples
//!
//! ```
//! use audio_ifeval_testing::builders::*;
//!
//! let sample = SampleBuilder::new("hello world")
//!     .with_response("upper_case", "HELLO WORLD")
//!     .build();
//! assert_eq!(sample.variation_responses.len(), 1);
//! ```

pub mod builders;
pub mod fixtures;

// Re-export commonly used types
pub use builders::*;
pub use fixtures::*;

// Re-export testing dependencies for convenience
pub use fake;
pub use proptest;
pub use tempfile;
