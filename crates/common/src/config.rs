//! Configuration management for the evaluation tools.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. `config/default.toml` (if it exists)
//! 3. An explicit file passed with `--config`
//! 4. Environment variables prefixed with `IFEVAL__`, e.g. `IFEVAL__SCORING__EPSILON=1e-5`
//!
//! ## Example Configuration
//!
//! ```toml
//! [scoring]
//! epsilon = 1e-6
//! normalized_precision = 2
//!
//! [scoring.constrain]
//! max_wer = 1.0
//! max_insertions = 3
//!
//! [cohort]
//! reference_metrics = "data/collect_all_metrics.json"
//!
//! [telemetry]
//! log_level = "info"
//! json_logging = false
//! ```

use anyhow::{Context, Result};
use audio_ifeval_domain::{ConstrainThresholds, ScoringSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Scoring and normalisation settings
    pub scoring: ScoringConfig,
    /// Cohort used for the area report
    pub cohort: CohortConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Denominator guard for normalisation and ASR inversion
    pub epsilon: f64,
    /// Transcript `constrain` thresholds
    pub constrain: ConstrainConfig,
    /// Round each normalised leaf to this many places
    pub normalized_precision: Option<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            constrain: ConstrainConfig::default(),
            normalized_precision: None,
        }
    }
}

/// Transcript `constrain` thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainConfig {
    /// WER fraction at or above which a response is rejected
    pub max_wer: f64,
    /// Insertion count at or above which a response is rejected
    pub max_insertions: i64,
}

impl Default for ConstrainConfig {
    fn default() -> Self {
        let defaults = ConstrainThresholds::default();
        Self {
            max_wer: defaults.max_wer,
            max_insertions: defaults.max_insertions as i64,
        }
    }
}

/// Cohort configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    /// Merged-metrics file of the existing cohort
    pub reference_metrics: PathBuf,
    /// Explicit model order; empty means file order
    pub models: Vec<String>,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            reference_metrics: PathBuf::from("data/collect_all_metrics.json"),
            models: Vec::new(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON logging format
    pub json_logging: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl EvalConfig {
    /// Load configuration from files and environment variables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use audio_ifeval_common::config::EvalConfig;
    ///
    /// let config = EvalConfig::load(None).expect("Failed to load configuration");
    /// println!("epsilon = {}", config.scoring.epsilon);
    /// ```
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("IFEVAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let eval_config: EvalConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        eval_config.validate()?;

        Ok(eval_config)
    }

    /// Parse a TOML document, without the file and environment layers.
    pub fn from_toml(source: &str) -> Result<Self> {
        let eval_config: EvalConfig = toml::from_str(source).context("Failed to parse configuration")?;
        eval_config.validate()?;
        Ok(eval_config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.scoring.epsilon.is_finite() && self.scoring.epsilon > 0.0) {
            anyhow::bail!("scoring.epsilon must be positive, got {}", self.scoring.epsilon);
        }

        if !(self.scoring.constrain.max_wer.is_finite() && self.scoring.constrain.max_wer >= 0.0) {
            anyhow::bail!(
                "scoring.constrain.max_wer must be non-negative, got {}",
                self.scoring.constrain.max_wer
            );
        }

        if self.scoring.constrain.max_insertions < 0 {
            anyhow::bail!(
                "scoring.constrain.max_insertions must be non-negative, got {}",
                self.scoring.constrain.max_insertions
            );
        }

        if let Some(places) = self.scoring.normalized_precision {
            if places > 12 {
                anyhow::bail!("scoring.normalized_precision must be at most 12, got {}", places);
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.telemetry.log_level,
                VALID_LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    /// Immutable scoring settings for the pipeline stages.
    pub fn scoring_settings(&self) -> ScoringSettings {
        ScoringSettings {
            epsilon: self.scoring.epsilon,
            constrain: ConstrainThresholds {
                max_wer: self.scoring.constrain.max_wer,
                max_insertions: self.scoring.constrain.max_insertions.max(0) as usize,
            },
            normalized_precision: self.scoring.normalized_precision,
        }
    }
}
