//! Error handling for VoxProc
//!
//! The signal path never fails: parameters are clamped and degenerate
//! buffers are no-ops. Errors only surface where data enters the crate
//! (buffer construction, preset loading, the CLI).

use thiserror::Error;

/// Result type alias for VoxProc operations
pub type Result<T> = std::result::Result<T, VoxError>;

/// Main error type for VoxProc operations
#[derive(Error, Debug)]
pub enum VoxError {
    // Buffer Errors
    #[error("Unsupported channel count: {channels} (expected 0, 1 or 2)")]
    UnsupportedChannelCount { channels: usize },

    #[error("Channel length mismatch: expected {expected} samples, got {got}")]
    ChannelLengthMismatch { expected: usize, got: usize },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VoxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VoxError::UnsupportedChannelCount { .. } => "UNSUPPORTED_CHANNEL_COUNT",
            VoxError::ChannelLengthMismatch { .. } => "CHANNEL_LENGTH_MISMATCH",
            VoxError::InvalidConfig { .. } => "INVALID_CONFIG",
            VoxError::Io(_) => "IO_ERROR",
            VoxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can fix this error by changing its input
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, VoxError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = VoxError::UnsupportedChannelCount { channels: 6 };
        assert_eq!(err.error_code(), "UNSUPPORTED_CHANNEL_COUNT");
        assert!(err.to_string().contains('6'));
    }

    #[test]
    fn test_serialization_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: VoxError = parse.unwrap_err().into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_error_not_recoverable() {
        let err: VoxError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(!err.is_recoverable());
    }
}
