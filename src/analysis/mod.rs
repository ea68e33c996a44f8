// Analysis module - feature extraction and classification pipeline
//
// Data flows strictly forward:
//
//   AudioSignal → FeatureExtractor → FeatureSet → FeatureVectorAssembler
//               → FeatureVector → Classifier → EmotionLabel
//
// Every stage is stateless apart from the shared read-only model.

pub mod assembler;
pub mod classifier;
pub mod features;
pub mod model;

pub use assembler::{FeatureVectorAssembler, FEATURE_COUNT, FEATURE_ORDER};
pub use classifier::{Classifier, EmotionLabel};
pub use features::{
    ExtractionReport, Extractor, FeatureExtractor, FeatureName, FeatureSet, FeatureValue,
    FeatureVector,
};
pub use model::{DecisionForest, EmotionModel};
