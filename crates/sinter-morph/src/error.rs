//! Error types for partial-set transformations.

use thiserror::Error;

/// Result type for transformation operations.
pub type MorphResult<T> = Result<T, MorphError>;

/// Errors that can occur configuring or running a transformation.
#[derive(Debug, Error)]
pub enum MorphError {
    /// Invalid configuration parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Morph input contains more than one partial with the same nonzero
    /// label; morphing requires distilled inputs.
    #[error("partials must be distilled before morphing: label {label} appears more than once")]
    NotDistilled {
        /// The duplicated label.
        label: i32,
    },
}

impl MorphError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = MorphError::invalid_param("fade_time", "must be positive");
        assert!(err.to_string().contains("fade_time"));

        let err = MorphError::NotDistilled { label: 7 };
        assert!(err.to_string().contains('7'));
    }
}
