//! Configuration management for the emotion classifier
//!
//! This module provides runtime configuration loading from JSON files so
//! analysis parameters, the model path and server limits can be adjusted
//! without recompilation. Missing or invalid files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub assembler: AssemblerConfig,
    pub model: ModelConfig,
    pub server: ServerConfig,
}

/// Shared framing and voice-analysis parameters used by every extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis frame length in samples (also the FFT size)
    pub frame_length: usize,
    /// Hop between consecutive frames in samples
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f64,
    /// Lowest pitch candidate in Hz
    pub pitch_floor_hz: f64,
    /// Highest pitch candidate in Hz
    pub pitch_ceiling_hz: f64,
    /// Minimum normalized autocorrelation for a frame to count as voiced
    pub voicing_threshold: f64,
    /// Frames quieter than this fraction of the global peak are unvoiced
    pub silence_threshold: f64,
    /// Upper bound of the formant search range in Hz
    pub max_formant_hz: f64,
    /// Number of formants the LPC model is sized for
    pub formant_count: usize,
    /// Signals must be strictly longer than this to be analysed
    pub min_duration_secs: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            n_mels: 128,
            rolloff_percent: 0.85,
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 600.0,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
            max_formant_hz: 5500.0,
            formant_count: 5,
            min_duration_secs: 0.1,
        }
    }
}

/// How undefined feature values are resolved before classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Fail the request naming the undefined feature
    Reject,
    /// Replace with the documented per-feature default
    #[default]
    Substitute,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub undefined_policy: UndefinedPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the frozen classifier artifact
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/emotion_forest.json"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
    /// Directory for staged uploads (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Time budget for feature extraction per request
    pub extraction_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
            temp_dir: None,
            extraction_timeout_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the conventional location
    pub fn load() -> Self {
        Self::load_from_file("config/emotion.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.frame_length, 2048);
        assert_eq!(config.analysis.hop_length, 512);
        assert_eq!(config.analysis.min_duration_secs, 0.1);
        assert_eq!(
            config.assembler.undefined_policy,
            UndefinedPolicy::Substitute
        );
        assert_eq!(
            config.model.path,
            PathBuf::from("models/emotion_forest.json")
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.analysis, config.analysis);
        assert_eq!(parsed.server.bind_addr, config.server.bind_addr);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "assembler": { "undefined_policy": "reject" } }"#).unwrap();
        assert_eq!(parsed.assembler.undefined_policy, UndefinedPolicy::Reject);
        assert_eq!(parsed.analysis.n_mels, 128);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = AppConfig::load_from_file("/nonexistent/emotion.json");
        assert_eq!(config.server.extraction_timeout_ms, 30_000);
    }
}
