//! Audio IFEval CLI Library
//!
//! This library provides the command handlers and output formatting behind
//! the `audio-ifeval` binary.

pub mod commands;
pub mod output;

pub use output::{render_report, OutputFormat};

/// Re-export common types
pub use anyhow::{Context, Result};
