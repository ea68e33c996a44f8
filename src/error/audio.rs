// Audio decoding error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported in HTTP error
/// payloads and CLI diagnostics.
///
/// Error code range: 1001-1003
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Input bytes are not a supported audio encoding
    pub const DECODE: i32 = 1001;

    /// Decoded audio is shorter than the minimum duration
    pub const TOO_SHORT: i32 = 1002;

    /// Reading or staging the audio failed
    pub const IO: i32 = 1003;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=SignalLoader, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio loading errors
///
/// These errors are user-facing: retrying with the same file will fail the
/// same way.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Bytes are not valid or supported audio
    Decode { reason: String },

    /// Duration does not exceed the minimum
    TooShort { duration_secs: f64, minimum_secs: f64 },

    /// Filesystem failure while staging or reading the upload
    Io { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::Decode { .. } => AudioErrorCodes::DECODE,
            AudioError::TooShort { .. } => AudioErrorCodes::TOO_SHORT,
            AudioError::Io { .. } => AudioErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::Decode { reason } => {
                format!("Unsupported or unreadable audio: {}", reason)
            }
            AudioError::TooShort {
                duration_secs,
                minimum_secs,
            } => format!(
                "Audio is too short ({:.3}s, must be longer than {:.3}s)",
                duration_secs, minimum_secs
            ),
            AudioError::Io { details } => format!("Audio I/O error: {}", details),
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::Io {
            details: err.to_string(),
        }
    }
}
