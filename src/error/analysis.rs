// Feature analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 2001-2005
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// A named feature could not be computed
    pub const EXTRACTION: i32 = 2001;

    /// A feature required by the assembler is missing
    pub const INCOMPLETE_FEATURE_SET: i32 = 2002;

    /// Assembled vector length differs from the model input dimensionality
    pub const DIMENSION_MISMATCH: i32 = 2003;

    /// An undefined feature reached the assembler under the reject policy
    pub const UNDEFINED_FEATURE: i32 = 2004;

    /// Extraction exceeded its time budget
    pub const TIMEOUT: i32 = 2005;
}

/// Log an analysis error with structured context
///
/// Contract violations are tagged separately so they can be told apart from
/// input-dependent failures.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    let component = if err.is_contract_violation() {
        "PipelineContract"
    } else {
        "FeatureExtractor"
    };
    error!(
        "Analysis error in {}: code={}, component={}, message={}",
        context,
        err.code(),
        component,
        err.message()
    );
}

/// Feature analysis errors
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Extractor for `feature` failed
    Extraction { feature: String, reason: String },

    /// Assembler keys absent from the feature set
    IncompleteFeatureSet { missing: Vec<String> },

    /// Vector length mismatch
    DimensionMismatch { expected: usize, actual: usize },

    /// Undefined value rejected by policy
    UndefinedFeature { feature: String },

    /// Extraction did not finish in time
    Timeout { elapsed_ms: u64 },
}

impl AnalysisError {
    /// True for defects between pipeline stages, never expected in correct operation
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AnalysisError::IncompleteFeatureSet { .. } | AnalysisError::DimensionMismatch { .. }
        )
    }

    pub(crate) fn extraction(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::Extraction {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::Extraction { .. } => AnalysisErrorCodes::EXTRACTION,
            AnalysisError::IncompleteFeatureSet { .. } => {
                AnalysisErrorCodes::INCOMPLETE_FEATURE_SET
            }
            AnalysisError::DimensionMismatch { .. } => AnalysisErrorCodes::DIMENSION_MISMATCH,
            AnalysisError::UndefinedFeature { .. } => AnalysisErrorCodes::UNDEFINED_FEATURE,
            AnalysisError::Timeout { .. } => AnalysisErrorCodes::TIMEOUT,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::Extraction { feature, reason } => {
                format!("Failed to compute feature '{}': {}", feature, reason)
            }
            AnalysisError::IncompleteFeatureSet { missing } => {
                format!("Feature set is missing: {}", missing.join(", "))
            }
            AnalysisError::DimensionMismatch { expected, actual } => format!(
                "Feature vector has {} values, classifier expects {}",
                actual, expected
            ),
            AnalysisError::UndefinedFeature { feature } => {
                format!("Feature '{}' is undefined for this audio", feature)
            }
            AnalysisError::Timeout { elapsed_ms } => {
                format!("Feature extraction timed out after {} ms", elapsed_ms)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for AnalysisError {}
