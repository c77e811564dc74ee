//! Error types for the evaluation domain.
//!
//! Missing variations and empty cohorts are not errors: the first contributes
//! zero responses, the second yields a not-applicable entry. Only conditions
//! that must stop a file's processing are represented here.

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Task name not recognised
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Dimension name not recognised
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Input could not be parsed as a sample record
    #[error("Malformed input in {origin}: {message}")]
    MalformedInput {
        /// File or stream the input came from
        origin: String,
        /// Parser message
        message: String,
    },

    /// Configuration value outside its allowed range
    #[error("Invalid setting {field}: {message}")]
    InvalidSetting {
        /// Setting path
        field: String,
        /// Why it was rejected
        message: String,
    },
}

impl DomainError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTask(_) => "UNKNOWN_TASK",
            Self::UnknownDimension(_) => "UNKNOWN_DIMENSION",
            Self::MalformedInput { .. } => "MALFORMED_INPUT",
            Self::InvalidSetting { .. } => "INVALID_SETTING",
        }
    }

    /// Malformed input helper.
    pub fn malformed(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedInput {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
