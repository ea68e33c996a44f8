//! Request handler for classification
//!
//! Orchestrates one request end to end:
//!
//! ```text
//! upload bytes → staged temp file → SignalLoader → FeatureExtractor
//!              → FeatureVectorAssembler → Classifier → EmotionLabel
//! ```
//!
//! The staged file lives in a `tempfile` guard and is removed when the guard
//! drops, on success and on every failure path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::analysis::{
    Classifier, DecisionForest, EmotionLabel, EmotionModel, ExtractionReport, FeatureExtractor,
    FeatureSet, FeatureVector, FeatureVectorAssembler, FEATURE_COUNT,
};
use crate::audio::{AudioSignal, SignalLoader};
use crate::config::AppConfig;
use crate::error::{
    log_analysis_error, log_audio_error, log_model_error, AudioError, ModelError, ServiceError,
};

/// Everything the extractors and assembler produced for one signal
#[derive(Debug, Clone, Serialize)]
pub struct FeatureAnalysis {
    pub features: FeatureSet,
    pub failures: Vec<String>,
    pub vector: Option<FeatureVector>,
    pub vector_error: Option<String>,
}

impl FeatureAnalysis {
    /// Extract and assemble without classifying
    ///
    /// Never fails: extractor failures and assembly problems are recorded in
    /// the result instead.
    pub fn compute(
        extractor: &FeatureExtractor,
        assembler: &FeatureVectorAssembler,
        signal: &AudioSignal,
    ) -> Self {
        let ExtractionReport { features, failures } = extractor.extract_all(signal);
        let (vector, vector_error) = match assembler.assemble(&features) {
            Ok(vector) => (Some(vector), None),
            Err(err) => (None, Some(err.to_string())),
        };

        Self {
            features,
            failures: failures.iter().map(ToString::to_string).collect(),
            vector,
            vector_error,
        }
    }
}

/// Shared classification pipeline
///
/// Holds only read-only state, so one instance serves concurrent requests
/// behind an `Arc`.
pub struct EmotionService {
    loader: SignalLoader,
    extractor: FeatureExtractor,
    assembler: FeatureVectorAssembler,
    classifier: Classifier,
    temp_dir: Option<PathBuf>,
    extraction_timeout: Duration,
}

impl EmotionService {
    /// Build the pipeline around an already loaded model
    ///
    /// # Errors
    /// `ModelError::Corrupt` when the model's input dimensionality does not
    /// match the assembled vector length.
    pub fn new(config: &AppConfig, model: Arc<dyn EmotionModel>) -> Result<Self, ModelError> {
        if model.input_dim() != FEATURE_COUNT {
            let err = ModelError::Corrupt {
                reason: format!(
                    "model expects {} features, pipeline produces {}",
                    model.input_dim(),
                    FEATURE_COUNT
                ),
            };
            log_model_error(&err, "EmotionService::new");
            return Err(err);
        }

        Ok(Self {
            loader: SignalLoader::new(config.analysis.min_duration_secs),
            extractor: FeatureExtractor::new(config.analysis.clone()),
            assembler: FeatureVectorAssembler::new(config.assembler.undefined_policy),
            classifier: Classifier::new(model),
            temp_dir: config.server.temp_dir.clone(),
            extraction_timeout: Duration::from_millis(config.server.extraction_timeout_ms),
        })
    }

    /// Load the model artifact named in `config` and build the pipeline
    pub fn from_config(config: &AppConfig) -> Result<Self, ModelError> {
        let forest = DecisionForest::load(&config.model.path).map_err(|err| {
            log_model_error(&err, "EmotionService::from_config");
            err
        })?;
        Self::new(config, Arc::new(forest))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn loader(&self) -> &SignalLoader {
        &self.loader
    }

    /// Classify an uploaded file
    ///
    /// `filename` only supplies the decode hint; the bytes are staged under a
    /// generated name in the configured temp directory.
    pub async fn classify_upload(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<EmotionLabel, ServiceError> {
        let started = Instant::now();
        let extension = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let loader = self.loader.clone();
        let temp_dir = self.temp_dir.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let staged = stage_upload(&bytes, temp_dir.as_deref(), extension.as_deref())?;
            loader.load_file(staged.path())
        })
        .await
        .map_err(|join_error| AudioError::Io {
            details: format!("decode task failed: {}", join_error),
        });

        let signal = decoded.and_then(|result| result).map_err(|err| {
            log_audio_error(&err, "classify_upload");
            ServiceError::from(err)
        })?;

        let label = self.classify_signal(Arc::new(signal)).await?;
        info!(
            emotion = %label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload classified"
        );
        Ok(label)
    }

    /// Classify a decoded signal with concurrent extraction
    pub async fn classify_signal(
        &self,
        signal: Arc<AudioSignal>,
    ) -> Result<EmotionLabel, ServiceError> {
        let report = self
            .extractor
            .extract_concurrent(Arc::clone(&signal), self.extraction_timeout)
            .await?;
        debug!(features = ?report.features, "feature set extracted");

        let features = report.into_result()?;
        let vector = self.assembler.assemble(&features).map_err(|err| {
            log_analysis_error(&err, "assemble");
            err
        })?;
        let label = self.classifier.classify(&vector).map_err(|err| {
            log_analysis_error(&err, "classify");
            err
        })?;
        Ok(label)
    }

    /// Run extraction and assembly sequentially and report everything
    pub fn analyze(&self, signal: &AudioSignal) -> FeatureAnalysis {
        FeatureAnalysis::compute(&self.extractor, &self.assembler, signal)
    }
}

/// Write `bytes` to a fresh temp file, keeping the extension as decode hint
fn stage_upload(
    bytes: &[u8],
    temp_dir: Option<&Path>,
    extension: Option<&str>,
) -> Result<NamedTempFile, AudioError> {
    let suffix = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-").suffix(&suffix);

    let mut staged = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FeatureValue;
    use crate::testing::{encode_wav, sine_wave};

    /// Neutral for clips longer than a second, sad otherwise
    struct DurationModel;

    impl EmotionModel for DurationModel {
        fn predict(&self, features: &FeatureVector) -> usize {
            if features.as_slice()[0] > 1.0 {
                4
            } else {
                5
            }
        }

        fn input_dim(&self) -> usize {
            FEATURE_COUNT
        }

        fn n_classes(&self) -> usize {
            7
        }
    }

    fn service(temp_dir: &Path) -> EmotionService {
        let mut config = AppConfig::default();
        config.server.temp_dir = Some(temp_dir.to_path_buf());
        EmotionService::new(&config, Arc::new(DurationModel)).unwrap()
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_upload_classified_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let wav = encode_wav(&sine_wave(16_000, 220.0, 2.0, 0.5), 16_000, 1);

        let label = service(dir.path())
            .classify_upload(wav, Some("clip.WAV"))
            .await
            .unwrap();
        assert_eq!(label, EmotionLabel::Neutral);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_too_short_upload_is_rejected_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let wav = encode_wav(&sine_wave(16_000, 220.0, 0.05, 0.5), 16_000, 1);

        let err = service(dir.path())
            .classify_upload(wav, Some("short.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Audio(AudioError::TooShort { .. })));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_garbage_upload_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = service(dir.path())
            .classify_upload(b"definitely not audio".to_vec(), Some("notes.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Audio(AudioError::Decode { .. })));
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_model_dimension_checked_at_construction() {
        struct Narrow;
        impl EmotionModel for Narrow {
            fn predict(&self, _features: &FeatureVector) -> usize {
                0
            }
            fn input_dim(&self) -> usize {
                33
            }
            fn n_classes(&self) -> usize {
                7
            }
        }

        let result = EmotionService::new(&AppConfig::default(), Arc::new(Narrow));
        assert!(matches!(result, Err(ModelError::Corrupt { .. })));
    }

    #[test]
    fn test_analyze_reports_silence() {
        let dir = tempfile::tempdir().unwrap();
        let signal = AudioSignal::new(vec![0.0; 16_000], 16_000, 0.1).unwrap();
        let analysis = service(dir.path()).analyze(&signal);

        assert!(analysis.failures.is_empty());
        assert_eq!(
            analysis.features.get(crate::analysis::FeatureName::Hnr),
            Some(FeatureValue::Undefined)
        );
        let vector = analysis.vector.unwrap();
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(vector.as_slice()[8], -200.0);
    }
}
