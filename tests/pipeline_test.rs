//! End-to-end pipeline tests over generated WAV files
//!
//! Exercises Loader → Extractors → Assembler → Classifier with the tiny
//! forest fixture.

use std::path::{Path, PathBuf};

use speech_emotion::analysis::{EmotionLabel, FeatureName, FeatureValue, FEATURE_COUNT};
use speech_emotion::config::UndefinedPolicy;
use speech_emotion::error::{AnalysisError, AudioError, ErrorCategory};
use speech_emotion::testing::{encode_wav, harmonic_tone, sine_wave, white_noise};
use speech_emotion::{AppConfig, EmotionService, ServiceError};

const ALL_OUTPUTS: [EmotionLabel; 8] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Happy,
    EmotionLabel::Neutral,
    EmotionLabel::Sad,
    EmotionLabel::Surprise,
    EmotionLabel::Unknown,
];

fn fixture_model() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/models/tiny_forest.json")
}

fn config(temp_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.model.path = fixture_model();
    config.server.temp_dir = Some(temp_dir.to_path_buf());
    config
}

fn service(temp_dir: &Path) -> EmotionService {
    EmotionService::from_config(&config(temp_dir)).expect("fixture model loads")
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).expect("read temp dir").next().is_none()
}

#[tokio::test]
async fn sine_upload_yields_valid_label() {
    let dir = tempfile::tempdir().unwrap();
    let wav = encode_wav(&sine_wave(16_000, 220.0, 2.0, 0.5), 16_000, 1);

    let label = service(dir.path())
        .classify_upload(wav, Some("tone.wav"))
        .await
        .unwrap();
    assert!(ALL_OUTPUTS.contains(&label));
    assert!(dir_is_empty(dir.path()));
}

#[tokio::test]
async fn classification_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let wav = encode_wav(&harmonic_tone(22_050, 180.0, 10, 1.5), 22_050, 1);

    let first = service
        .classify_upload(wav.clone(), Some("voice.wav"))
        .await
        .unwrap();
    let second = service
        .classify_upload(wav, Some("voice.wav"))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn stereo_upload_is_downmixed() {
    let dir = tempfile::tempdir().unwrap();
    let left = sine_wave(16_000, 300.0, 1.0, 0.4);
    let right = white_noise(16_000, 1.0, 0.1, 3);
    let interleaved: Vec<f32> = left
        .iter()
        .zip(&right)
        .flat_map(|(l, r)| [*l, *r])
        .collect();
    let wav = encode_wav(&interleaved, 16_000, 2);

    let label = service(dir.path())
        .classify_upload(wav, Some("stereo.wav"))
        .await
        .unwrap();
    assert!(ALL_OUTPUTS.contains(&label));
}

#[tokio::test]
async fn too_short_upload_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let wav = encode_wav(&sine_wave(16_000, 220.0, 0.1, 0.5), 16_000, 1);

    let err = service(dir.path())
        .classify_upload(wav, Some("blip.wav"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Audio(AudioError::TooShort { .. })));
    assert_eq!(err.category(), ErrorCategory::InvalidInput);
    assert!(dir_is_empty(dir.path()));
}

#[tokio::test]
async fn silence_substitutes_undefined_voice_features() {
    let dir = tempfile::tempdir().unwrap();
    let wav = encode_wav(&vec![0.0; 16_000], 16_000, 1);

    let label = service(dir.path())
        .classify_upload(wav, Some("silence.wav"))
        .await
        .unwrap();
    assert!(ALL_OUTPUTS.contains(&label));
}

#[tokio::test]
async fn silence_under_reject_policy_is_categorized_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.assembler.undefined_policy = UndefinedPolicy::Reject;
    let service = EmotionService::from_config(&config).unwrap();

    let wav = encode_wav(&vec![0.0; 16_000], 16_000, 1);
    let err = service
        .classify_upload(wav, Some("silence.wav"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Analysis(AnalysisError::UndefinedFeature { .. })
    ));
    assert_eq!(err.category(), ErrorCategory::Processing);
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn feature_analysis_of_sine() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());
    let wav = encode_wav(&sine_wave(16_000, 440.0, 2.0, 0.5), 16_000, 1);
    let path = dir.path().join("tone.wav");
    std::fs::write(&path, wav).unwrap();

    let signal = service.loader().load_file(&path).unwrap();
    let analysis = service.analyze(&signal);

    assert!(analysis.failures.is_empty());
    let vector = analysis.vector.expect("vector assembled");
    assert_eq!(vector.len(), FEATURE_COUNT);

    let pitch = analysis
        .features
        .get(FeatureName::FundamentalFrequency)
        .and_then(|v| v.as_defined())
        .unwrap();
    assert!((pitch - 440.0).abs() < 10.0, "pitch {}", pitch);

    let zcr = analysis
        .features
        .get(FeatureName::ZeroCrossingRate)
        .and_then(|v| v.as_defined())
        .unwrap();
    assert!((zcr - 0.055).abs() < 0.0055, "zcr {}", zcr);

    assert!(matches!(
        analysis.features.get(FeatureName::Duration),
        Some(FeatureValue::Defined(d)) if (d - 2.0).abs() < 1e-3
    ));
}

#[test]
fn missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.model.path = dir.path().join("absent.json");
    assert!(EmotionService::from_config(&config).is_err());
}
