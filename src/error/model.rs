// Classifier model error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Model error code constants
///
/// Error code range: 3001-3003
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// Artifact missing or unreadable
    pub const UNAVAILABLE: i32 = 3001;

    /// Artifact parsed but structurally invalid
    pub const CORRUPT: i32 = 3002;

    /// Artifact format version not understood
    pub const UNSUPPORTED_VERSION: i32 = 3003;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=ClassifierAdapter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Classifier artifact errors
///
/// All of these are fatal at startup: the process must not serve traffic
/// without a usable model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Unavailable { path: String, reason: String },
    Corrupt { reason: String },
    UnsupportedVersion { found: u32 },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::Unavailable { .. } => ModelErrorCodes::UNAVAILABLE,
            ModelError::Corrupt { .. } => ModelErrorCodes::CORRUPT,
            ModelError::UnsupportedVersion { .. } => ModelErrorCodes::UNSUPPORTED_VERSION,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::Unavailable { path, reason } => {
                format!("Classifier model unavailable at {}: {}", path, reason)
            }
            ModelError::Corrupt { reason } => format!("Classifier model is corrupt: {}", reason),
            ModelError::UnsupportedVersion { found } => {
                format!("Unsupported classifier model format version {}", found)
            }
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for ModelError {}
