//! Error handling for Seamloop
//!
//! Every error names the operation that failed and the constraint it violated,
//! so callers can show an actionable message without inspecting internals.

use thiserror::Error;

/// Result type alias for Seamloop operations
pub type Result<T> = std::result::Result<T, LoopError>;

/// Main error type for Seamloop operations
#[derive(Error, Debug)]
pub enum LoopError {
    // Buffer Errors
    #[error("Invalid buffer dimensions in {operation}: {reason}")]
    InvalidDimensions {
        operation: &'static str,
        reason: String,
    },

    #[error("Selection too short: {duration_secs:.3}s (minimum {minimum_secs}s)")]
    SelectionTooShort {
        duration_secs: f64,
        minimum_secs: f64,
    },

    #[error("Audio too short: {duration_secs:.3}s (minimum {minimum_secs}s)")]
    AudioTooShort {
        duration_secs: f64,
        minimum_secs: f64,
    },

    // Crossfade Errors
    #[error(
        "Crossfade too long: {crossfade_secs:.3}s exceeds {limit_secs:.3}s (half of the {buffer_secs:.3}s clip)"
    )]
    CrossfadeTooLong {
        crossfade_secs: f64,
        limit_secs: f64,
        buffer_secs: f64,
    },

    #[error("Invalid crossfade duration: {duration_secs}")]
    InvalidCrossfade { duration_secs: f64 },

    // Container Errors
    #[error("Malformed WAV container: {reason}")]
    MalformedContainer { reason: String },

    #[error("Decoding failed: {reason}")]
    DecodeFailed {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoopError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        LoopError::MalformedContainer {
            reason: reason.into(),
        }
    }

    pub(crate) fn dimensions(operation: &'static str, reason: impl Into<String>) -> Self {
        LoopError::InvalidDimensions {
            operation,
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LoopError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            LoopError::SelectionTooShort { .. } => "SELECTION_TOO_SHORT",
            LoopError::AudioTooShort { .. } => "AUDIO_TOO_SHORT",
            LoopError::CrossfadeTooLong { .. } => "CROSSFADE_TOO_LONG",
            LoopError::InvalidCrossfade { .. } => "INVALID_CROSSFADE",
            LoopError::MalformedContainer { .. } => "MALFORMED_CONTAINER",
            LoopError::DecodeFailed { .. } => "DECODE_FAILED",
            LoopError::Config { .. } => "CONFIG_ERROR",
            LoopError::Io(_) => "IO_ERROR",
            LoopError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by changing the user's input
    pub fn is_recoverable(&self) -> bool {
        match self {
            LoopError::SelectionTooShort { .. } => true,
            LoopError::CrossfadeTooLong { .. } => true,
            LoopError::InvalidCrossfade { .. } => true,
            LoopError::AudioTooShort { .. } => true,
            LoopError::DecodeFailed { .. } => true,
            LoopError::MalformedContainer { .. } => true,
            LoopError::Config { .. } => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LoopError::SelectionTooShort { .. } => vec![
                "Widen the selection to at least 0.2 seconds",
                "Reset to the original audio and select again",
            ],
            LoopError::AudioTooShort { .. } => vec![
                "Record a clip longer than 0.2 seconds",
                "Check that the file is not truncated",
            ],
            LoopError::CrossfadeTooLong { .. } => vec![
                "Choose a shorter crossfade",
                "The crossfade can be at most half of the clip length",
            ],
            LoopError::InvalidCrossfade { .. } => {
                vec!["Crossfade duration must be a non-negative number of seconds"]
            }
            LoopError::MalformedContainer { .. } => vec![
                "Only canonical 16-bit PCM WAV data can be decoded here",
                "Re-export the file from its source",
            ],
            LoopError::DecodeFailed { .. } => vec![
                "Try converting the file to WAV format first",
                "Check if the file plays in another application",
            ],
            LoopError::Config { .. } => vec!["Check the configuration file for typos"],
            _ => vec![],
        }
    }
}
