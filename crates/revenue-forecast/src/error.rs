//! Error types for the revenue forecasting pipeline.
//!
//! Every failure is fatal to a run: the pipeline aborts on the first error
//! and no output file is considered valid. Errors still carry a stable code
//! so that callers (the CLI's `--json` mode, or a dashboard refresh job) can
//! tell a schema problem from an unwritable output directory.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the forecasting pipeline.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// The input dataset does not exist.
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input columns do not match the canonical sales schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A cell is null or cannot be parsed into the column's type.
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not enough rows to split, fit or score.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Model fitting or prediction failed.
    #[error("Model error: {0}")]
    Model(String),

    /// Writing one of the output files failed.
    #[error("Failed to write output '{}': {reason}", .path.display())]
    OutputFailed { path: PathBuf, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ForecastError>,
    },
}

impl ForecastError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ForecastError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, preserved through [`with_context`](Self::with_context).
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::Model(_) => "MODEL_ERROR",
            Self::OutputFailed { .. } => "OUTPUT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by the input dataset rather than the
    /// environment (missing file, bad schema, bad cell values).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::FileNotFound(_) | Self::SchemaMismatch(_) | Self::InvalidValue { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as `{ code, message }` for `--json` consumers.
impl Serialize for ForecastError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ForecastError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<crate::config::ConfigValidationError> for ForecastError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ForecastError::InvalidConfig(err.to_string())
    }
}

/// Result type alias for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ForecastError::Polars(e).with_context(context))
    }
}
