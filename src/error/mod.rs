// Error types for the speech emotion classifier
//
// This module defines custom error types for decoding, feature analysis and
// model loading, providing structured error handling with numeric error codes
// suitable for JSON error payloads and CLI exit reporting.

mod analysis;
mod audio;
mod model;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the HTTP and CLI boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Coarse error category reported to callers alongside the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The uploaded audio cannot be used (bad encoding, too short)
    InvalidInput,
    /// A feature could not be computed for this input
    Processing,
    /// Extraction exceeded the request time budget
    Timeout,
    /// Contract violation between pipeline stages or model failure
    Internal,
}

/// Errors surfaced by a full classification request
///
/// Wraps the stage-specific errors so the request handler can report a single
/// category, code and message without exposing internals.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    Audio(AudioError),
    Analysis(AnalysisError),
    Model(ModelError),
}

impl ServiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServiceError::Audio(_) => ErrorCategory::InvalidInput,
            ServiceError::Analysis(AnalysisError::Timeout { .. }) => ErrorCategory::Timeout,
            ServiceError::Analysis(err) if err.is_contract_violation() => ErrorCategory::Internal,
            ServiceError::Analysis(_) => ErrorCategory::Processing,
            ServiceError::Model(_) => ErrorCategory::Internal,
        }
    }
}

impl ErrorCode for ServiceError {
    fn code(&self) -> i32 {
        match self {
            ServiceError::Audio(err) => err.code(),
            ServiceError::Analysis(err) => err.code(),
            ServiceError::Model(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ServiceError::Audio(err) => err.message(),
            ServiceError::Analysis(err) => err.message(),
            ServiceError::Model(err) => err.message(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Audio(err) => err.fmt(f),
            ServiceError::Analysis(err) => err.fmt(f),
            ServiceError::Model(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<AudioError> for ServiceError {
    fn from(err: AudioError) -> Self {
        ServiceError::Audio(err)
    }
}

impl From<AnalysisError> for ServiceError {
    fn from(err: AnalysisError) -> Self {
        ServiceError::Analysis(err)
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        ServiceError::Model(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_categories() {
        let err = ServiceError::from(AudioError::TooShort {
            duration_secs: 0.05,
            minimum_secs: 0.1,
        });
        assert_eq!(err.category(), ErrorCategory::InvalidInput);

        let err = ServiceError::from(AnalysisError::Extraction {
            feature: "hnr".to_string(),
            reason: "boom".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::Processing);

        let err = ServiceError::from(AnalysisError::DimensionMismatch {
            expected: 14,
            actual: 13,
        });
        assert_eq!(err.category(), ErrorCategory::Internal);

        let err = ServiceError::from(AnalysisError::Timeout { elapsed_ms: 10 });
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_service_error_delegates_code() {
        let inner = AudioError::Decode {
            reason: "not audio".to_string(),
        };
        let err = ServiceError::from(inner.clone());
        assert_eq!(err.code(), inner.code());
        assert_eq!(err.message(), inner.message());
    }
}
