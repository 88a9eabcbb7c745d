//! Error types for the analysis pipeline.

use thiserror::Error;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that can occur configuring or running analysis.
///
/// Configuration problems are rejected before any processing begins;
/// degenerate inputs (empty sample buffers, silent frames) are not
/// errors and produce empty results instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid configuration parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Invalid sample rate.
    #[error("invalid sample rate: {rate} Hz")]
    InvalidSampleRate {
        /// The invalid sample rate.
        rate: f64,
    },
}

impl AnalysisError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}
