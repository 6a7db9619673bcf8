//! Error handling for Heartest
//!
//! Every failure is terminal for the single operation that raised it.
//! Nothing is retried; callers surface the error and carry on.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Heartest operations
pub type Result<T> = std::result::Result<T, HeartestError>;

/// Main error type for Heartest operations
#[derive(Error, Debug)]
pub enum HeartestError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Processing Errors
    #[error("Invalid parameter '{param}': got {value}, expected {expected}")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Case Errors
    #[error("Incomplete valve set: missing {}", missing.join(", "))]
    IncompleteValveSet { missing: Vec<String> },

    #[error("Case store {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    // Notification Errors
    #[error("Notification failed: {reason}")]
    NotificationError { reason: String },

    // Configuration Errors
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeartestError {
    /// Shorthand for building an `InvalidParameter` error
    pub fn invalid_parameter(
        param: &str,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        HeartestError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Shorthand for building a `NotificationError`
    pub fn notification(reason: impl Into<String>) -> Self {
        HeartestError::NotificationError {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            HeartestError::FileNotFound { .. } => "FILE_NOT_FOUND",
            HeartestError::InvalidAudio { .. } => "INVALID_AUDIO",
            HeartestError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            HeartestError::EmptyAudio => "EMPTY_AUDIO",
            HeartestError::InvalidParameter { .. } => "INVALID_PARAMETER",
            HeartestError::IncompleteValveSet { .. } => "INCOMPLETE_VALVE_SET",
            HeartestError::CorruptStore { .. } => "CORRUPT_STORE",
            HeartestError::NotificationError { .. } => "NOTIFICATION_ERROR",
            HeartestError::Config { .. } => "CONFIG_ERROR",
            HeartestError::Io(_) => "IO_ERROR",
            HeartestError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            HeartestError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Re-upload the recording for this valve",
            ],
            HeartestError::InvalidAudio { .. } | HeartestError::UnsupportedFormat { .. } => vec![
                "Export the recording as a PCM WAV file",
                "Check if the file plays in another application",
            ],
            HeartestError::InvalidParameter { .. } => vec![
                "Keep the noise cutoff between 0 and 0.5",
                "Keep the duration within the length of the recording",
            ],
            HeartestError::IncompleteValveSet { .. } => vec![
                "Upload a recording for each of the Aortic, Pulmonary, Tricuspid and Mitral sites",
            ],
            HeartestError::CorruptStore { .. } => vec![
                "Restore the case file from a backup",
                "Inspect the file for a truncated or hand-edited entry",
            ],
            HeartestError::NotificationError { .. } => vec![
                "Check the phone number is in international format (e.g. +15558675309)",
                "Verify TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER are set",
            ],
            _ => vec![],
        }
    }
}
