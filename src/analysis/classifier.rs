// Classifier - maps model output to an emotion label
//
// The frozen model returns a class index. The index is translated through a
// fixed lookup table; anything outside it becomes `EmotionLabel::Unknown`
// rather than an error or a guessed label.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::features::FeatureVector;
use crate::analysis::model::EmotionModel;
use crate::error::AnalysisError;

/// Emotion categories the classifier can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
    /// Model returned an index outside the lookup table
    Unknown,
}

/// Class index → label, in training order
pub const LABEL_TABLE: [EmotionLabel; 7] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Happy,
    EmotionLabel::Neutral,
    EmotionLabel::Sad,
    EmotionLabel::Surprise,
];

impl EmotionLabel {
    pub fn from_index(index: usize) -> Self {
        LABEL_TABLE
            .get(index)
            .copied()
            .unwrap_or(EmotionLabel::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier adapter around a shared read-only model
#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn EmotionModel>,
}

impl Classifier {
    pub fn new(model: Arc<dyn EmotionModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn EmotionModel {
        self.model.as_ref()
    }

    /// Classify an assembled feature vector
    ///
    /// # Errors
    /// `DimensionMismatch` when the vector length differs from the model's
    /// input dimensionality; the model is never called with a wrong-sized vector.
    pub fn classify(&self, features: &FeatureVector) -> Result<EmotionLabel, AnalysisError> {
        let expected = self.model.input_dim();
        if features.len() != expected {
            return Err(AnalysisError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }

        let index = self.model.predict(features);
        let label = EmotionLabel::from_index(index);
        debug!(class_index = index, label = %label, "classified feature vector");
        Ok(label)
    }
}
