//! CLI commands

pub mod area;
pub mod merge;
pub mod metric;

use audio_ifeval_common::EvalConfig;

use crate::output::OutputFormat;

/// Context passed to all commands
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub config: EvalConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(config: EvalConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }
}
