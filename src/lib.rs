// Speech Emotion Classifier Core
// Audio decoding, acoustic feature extraction and frozen-model classification

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod service;
pub mod testing;

// Re-exports for convenience
pub use analysis::{EmotionLabel, FeatureName, FeatureValue, FeatureVector};
pub use config::AppConfig;
pub use error::{AnalysisError, AudioError, ModelError, ServiceError};
pub use service::EmotionService;
