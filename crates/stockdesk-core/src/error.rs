use thiserror::Error;

/// Validation and contract errors exposed by `stockdesk-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("instrument code cannot be empty")]
    EmptyCode,
    #[error("instrument code length {len} exceeds max {max}")]
    CodeTooLong { len: usize, max: usize },
    #[error("instrument code contains invalid character '{ch}' at index {index}")]
    CodeInvalidChar { ch: char, index: usize },

    #[error("invalid granularity '{value}', expected one of daily, weekly, monthly")]
    InvalidGranularity { value: String },

    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("statement row '{label}' has {actual} values but the table has {expected} columns")]
    StatementShape {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
