//! Error taxonomy of the change detection engine
//!
//! Abstention (not enough data, disabled bounds) is not an error: models
//! simply emit nothing. Everything here is either a configuration problem
//! the host must fix, or an infrastructure failure of the external tool.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while detecting changes
#[derive(Error, Debug)]
pub enum ChangeDetectionError {
    #[error("Unknown model type: {0}")]
    UnknownModel(String),

    #[error("Invalid configuration for model {model}: {reason}")]
    InvalidConfig { model: String, reason: String },

    #[error("Change point tool rejected the series in {input}: {reason}")]
    Validation { input: PathBuf, reason: String },

    #[error("Failed to start change point tool '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Change point tool '{command}' exited with {status}: {stderr}")]
    ToolFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to load history for variable {variable_id}: {message}")]
    History { variable_id: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChangeDetectionError {
    pub(crate) fn invalid_config(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidConfig {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// True for problems the host fixes by editing variable configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownModel(_) | Self::InvalidConfig { .. })
    }
}

/// Result type for change detection operations
pub type Result<T> = std::result::Result<T, ChangeDetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_distinguishable() {
        assert!(ChangeDetectionError::UnknownModel("foo".into()).is_configuration());
        assert!(ChangeDetectionError::invalid_config("x", "bad").is_configuration());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!ChangeDetectionError::from(io).is_configuration());
        assert!(!ChangeDetectionError::Validation {
            input: PathBuf::from("/tmp/x.csv"),
            reason: "INVALID".into(),
        }
        .is_configuration());
    }

    #[test]
    fn test_unknown_model_message() {
        let err = ChangeDetectionError::UnknownModel("bogus".into());
        assert_eq!(err.to_string(), "Unknown model type: bogus");
    }
}
