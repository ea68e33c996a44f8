// FeatureExtractor - DSP feature extraction for speech emotion classification
//
// This module turns a decoded signal into named acoustic descriptors. Every
// extractor is a pure function of (samples, sample rate, analysis parameters)
// and shares the same centred framing, so extractors can run in any order or
// in parallel and still agree on frame boundaries.
//
// Module organization:
// - types: Feature catalog, values and containers
// - fft: Framing, Hann window and STFT
// - spectral: Centroid, bandwidth, flatness, rolloff
// - mel: Slaney mel filterbank
// - temporal: Amplitude, ZCR, RMS, sample-energy entropy
// - voice: Pitch and HNR from frame periodicity
// - formant: F1/F2 from Burg LPC
// - mod.rs: Coordinator (Extractor, FeatureExtractor)
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

mod fft;
mod formant;
mod mel;
mod spectral;
mod temporal;
mod types;
mod voice;

pub use types::{ExtractionReport, FeatureName, FeatureSet, FeatureValue, FeatureVector};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::audio::AudioSignal;
use crate::config::AnalysisConfig;
use crate::error::{log_analysis_error, AnalysisError};
use fft::Stft;
use formant::FormantTracker;
use mel::MelFilterbank;
use spectral::SpectralFeatures;
use temporal::TemporalFeatures;
use voice::VoiceAnalyzer;

/// One independent unit of extraction
///
/// Most extractors produce a single descriptor; `Amplitude` and `Formants`
/// produce a small fixed group from one pass over the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extractor {
    Duration,
    SampleRate,
    Amplitude,
    ZeroCrossingRate,
    Rms,
    SpectralEntropy,
    Pitch,
    Formants,
    Harmonicity,
    MelSpectrogram,
    SpectralCentroid,
    SpectralRolloff,
    SpectralBandwidth,
    SpectralFlatness,
}

impl Extractor {
    pub const ALL: [Extractor; 14] = [
        Extractor::Duration,
        Extractor::SampleRate,
        Extractor::Amplitude,
        Extractor::ZeroCrossingRate,
        Extractor::Rms,
        Extractor::SpectralEntropy,
        Extractor::Pitch,
        Extractor::Formants,
        Extractor::Harmonicity,
        Extractor::MelSpectrogram,
        Extractor::SpectralCentroid,
        Extractor::SpectralRolloff,
        Extractor::SpectralBandwidth,
        Extractor::SpectralFlatness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Duration => "duration",
            Extractor::SampleRate => "sample_rate",
            Extractor::Amplitude => "amplitude",
            Extractor::ZeroCrossingRate => "zero_crossing_rate",
            Extractor::Rms => "rms",
            Extractor::SpectralEntropy => "spectral_entropy",
            Extractor::Pitch => "fundamental_frequency",
            Extractor::Formants => "formants",
            Extractor::Harmonicity => "hnr",
            Extractor::MelSpectrogram => "mel_spectrogram_mean",
            Extractor::SpectralCentroid => "spectral_centroid",
            Extractor::SpectralRolloff => "spectral_rolloff",
            Extractor::SpectralBandwidth => "spectral_bandwidth",
            Extractor::SpectralFlatness => "spectral_flatness",
        }
    }

    /// Catalog keys this extractor fills in
    pub fn outputs(&self) -> &'static [FeatureName] {
        match self {
            Extractor::Duration => &[FeatureName::Duration],
            Extractor::SampleRate => &[FeatureName::SampleRate],
            Extractor::Amplitude => &[FeatureName::MaxAmplitude, FeatureName::MinAmplitude],
            Extractor::ZeroCrossingRate => &[FeatureName::ZeroCrossingRate],
            Extractor::Rms => &[FeatureName::Rms],
            Extractor::SpectralEntropy => &[FeatureName::SpectralEntropy],
            Extractor::Pitch => &[FeatureName::FundamentalFrequency],
            Extractor::Formants => &[FeatureName::Formant1, FeatureName::Formant2],
            Extractor::Harmonicity => &[FeatureName::Hnr],
            Extractor::MelSpectrogram => &[FeatureName::MelSpectrogramMean],
            Extractor::SpectralCentroid => &[FeatureName::SpectralCentroid],
            Extractor::SpectralRolloff => &[FeatureName::SpectralRolloff],
            Extractor::SpectralBandwidth => &[FeatureName::SpectralBandwidth],
            Extractor::SpectralFlatness => &[FeatureName::SpectralFlatness],
        }
    }

    /// Compute this extractor's descriptors
    ///
    /// Defined values are always finite; a non-finite result is reported as
    /// an extraction error naming the offending feature.
    pub fn extract(
        &self,
        signal: &AudioSignal,
        config: &AnalysisConfig,
    ) -> Result<Vec<(FeatureName, FeatureValue)>, AnalysisError> {
        let samples = signal.samples();
        let sample_rate = signal.sample_rate();

        if samples.is_empty() || sample_rate == 0 {
            return Err(AnalysisError::extraction(self.name(), "signal is empty"));
        }

        let defined = |name: FeatureName, value: f64| (name, FeatureValue::Defined(value));
        let optional = |name: FeatureName, value: Option<f64>| {
            (name, value.map_or(FeatureValue::Undefined, FeatureValue::Defined))
        };

        let temporal = || TemporalFeatures::new(config.frame_length, config.hop_length);

        let values = match self {
            Extractor::Duration => vec![defined(FeatureName::Duration, signal.duration_secs())],
            Extractor::SampleRate => vec![defined(FeatureName::SampleRate, sample_rate as f64)],
            Extractor::Amplitude => {
                let (max, min) = temporal().compute_amplitude_range(samples);
                vec![
                    defined(FeatureName::MaxAmplitude, max),
                    defined(FeatureName::MinAmplitude, min),
                ]
            }
            Extractor::ZeroCrossingRate => vec![defined(
                FeatureName::ZeroCrossingRate,
                temporal().compute_zcr(samples),
            )],
            Extractor::Rms => vec![defined(FeatureName::Rms, temporal().compute_rms(samples))],
            Extractor::SpectralEntropy => vec![defined(
                FeatureName::SpectralEntropy,
                temporal().compute_entropy(samples),
            )],
            Extractor::Pitch => {
                let voice = VoiceAnalyzer::new(config, sample_rate);
                vec![optional(FeatureName::FundamentalFrequency, voice.median_pitch(samples))]
            }
            Extractor::Harmonicity => {
                let voice = VoiceAnalyzer::new(config, sample_rate);
                vec![optional(FeatureName::Hnr, voice.mean_hnr(samples))]
            }
            Extractor::Formants => {
                let pair = FormantTracker::new(config).first_two(samples, sample_rate);
                vec![
                    optional(FeatureName::Formant1, pair.map(|(f1, _)| f1)),
                    optional(FeatureName::Formant2, pair.map(|(_, f2)| f2)),
                ]
            }
            Extractor::MelSpectrogram => {
                let stft = Stft::new(config.frame_length, config.hop_length);
                let bank = MelFilterbank::new(
                    config.n_mels,
                    sample_rate,
                    &stft.bin_frequencies(sample_rate),
                );
                let (total, frames) = stft.magnitudes(samples).fold((0.0, 0usize), |(total, n), spectrum| {
                    let power: Vec<f64> = spectrum.iter().map(|&m| (m as f64) * (m as f64)).collect();
                    (total + bank.apply(&power).iter().sum::<f64>(), n + 1)
                });
                let cells = (frames * bank.n_mels()).max(1);
                vec![defined(FeatureName::MelSpectrogramMean, total / cells as f64)]
            }
            Extractor::SpectralCentroid => {
                let value = spectral_mean(signal, config, |f, spectrum| f.compute_centroid(spectrum));
                vec![defined(FeatureName::SpectralCentroid, value)]
            }
            Extractor::SpectralRolloff => {
                let value = spectral_mean(signal, config, |f, spectrum| f.compute_rolloff(spectrum));
                vec![defined(FeatureName::SpectralRolloff, value)]
            }
            Extractor::SpectralBandwidth => {
                let value = spectral_mean(signal, config, |f, spectrum| {
                    let centroid = f.compute_centroid(spectrum);
                    f.compute_bandwidth(spectrum, centroid)
                });
                vec![defined(FeatureName::SpectralBandwidth, value)]
            }
            Extractor::SpectralFlatness => {
                let value = spectral_mean(signal, config, |f, spectrum| f.compute_flatness(spectrum));
                vec![defined(FeatureName::SpectralFlatness, value)]
            }
        };

        for (name, value) in &values {
            if let FeatureValue::Defined(v) = value {
                if !v.is_finite() {
                    return Err(AnalysisError::extraction(
                        name.as_str(),
                        format!("non-finite value {}", v),
                    ));
                }
            }
        }

        Ok(values)
    }
}

/// Mean of a per-frame spectral descriptor over the magnitude spectrogram
fn spectral_mean<F>(signal: &AudioSignal, config: &AnalysisConfig, per_frame: F) -> f64
where
    F: Fn(&SpectralFeatures, &[f32]) -> f64,
{
    let stft = Stft::new(config.frame_length, config.hop_length);
    let features = SpectralFeatures::new(
        stft.bin_frequencies(signal.sample_rate()),
        config.rolloff_percent,
    );

    let (total, frames) = stft
        .magnitudes(signal.samples())
        .fold((0.0, 0usize), |(total, n), spectrum| {
            (total + per_frame(&features, &spectrum), n + 1)
        });

    total / frames.max(1) as f64
}

/// FeatureExtractor coordinates the extraction pipeline
///
/// Results are tagged per extractor: one extractor's failure is recorded in
/// the report and never erases another's values.
pub struct FeatureExtractor {
    config: Arc<AnalysisConfig>,
}

impl FeatureExtractor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run every extractor sequentially on the calling thread
    pub fn extract_all(&self, signal: &AudioSignal) -> ExtractionReport {
        let results = Extractor::ALL
            .iter()
            .map(|extractor| (*extractor, extractor.extract(signal, &self.config)));
        collect_report(results)
    }

    /// Run every extractor as its own blocking task
    ///
    /// The whole batch is bounded by `timeout`; when it expires the request
    /// fails with `AnalysisError::Timeout` instead of waiting on stragglers.
    pub async fn extract_concurrent(
        &self,
        signal: Arc<AudioSignal>,
        timeout: Duration,
    ) -> Result<ExtractionReport, AnalysisError> {
        let started = Instant::now();

        let tasks = Extractor::ALL.iter().map(|&extractor| {
            let signal = Arc::clone(&signal);
            let config = Arc::clone(&self.config);
            let handle =
                tokio::task::spawn_blocking(move || extractor.extract(&signal, &config));
            async move {
                let result = handle.await.unwrap_or_else(|join_error| {
                    Err(AnalysisError::extraction(
                        extractor.name(),
                        format!("extractor task failed: {}", join_error),
                    ))
                });
                (extractor, result)
            }
        });

        let results = tokio::time::timeout(timeout, join_all(tasks))
            .await
            .map_err(|_| {
                let err = AnalysisError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                log_analysis_error(&err, "extract_concurrent");
                err
            })?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "concurrent extraction finished"
        );
        Ok(collect_report(results))
    }
}

fn collect_report<I>(results: I) -> ExtractionReport
where
    I: IntoIterator<Item = (Extractor, Result<Vec<(FeatureName, FeatureValue)>, AnalysisError>)>,
{
    let mut report = ExtractionReport::default();
    for (extractor, result) in results {
        match result {
            Ok(values) => {
                for (name, value) in values {
                    report.features.insert(name, value);
                }
            }
            Err(err) => {
                warn!(extractor = extractor.name(), "feature extraction failed");
                log_analysis_error(&err, extractor.name());
                report.failures.push(err);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sine_wave, white_noise};

    fn signal(samples: Vec<f32>, sample_rate: u32) -> AudioSignal {
        AudioSignal::new(samples, sample_rate, 0.1).unwrap()
    }

    fn value(set: &FeatureSet, name: FeatureName) -> f64 {
        set.get(name)
            .and_then(|v| v.as_defined())
            .unwrap_or_else(|| panic!("{} should be defined", name))
    }

    #[test]
    fn test_outputs_cover_catalog() {
        let mut produced: Vec<FeatureName> = Extractor::ALL
            .iter()
            .flat_map(|e| e.outputs().iter().copied())
            .collect();
        produced.sort();
        let mut catalog = FeatureName::ALL.to_vec();
        catalog.sort();
        assert_eq!(produced, catalog);
    }

    #[test]
    fn test_sine_features() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let report = extractor.extract_all(&signal(sine_wave(16_000, 440.0, 2.0, 0.5), 16_000));
        assert!(report.is_complete(), "failures: {:?}", report.failures);
        let set = &report.features;

        assert_eq!(set.len(), FeatureName::ALL.len());
        assert!((value(set, FeatureName::Duration) - 2.0).abs() < 1e-9);
        assert_eq!(value(set, FeatureName::SampleRate), 16_000.0);
        assert!((value(set, FeatureName::MaxAmplitude) - 0.5).abs() < 1e-3);

        let pitch = value(set, FeatureName::FundamentalFrequency);
        assert!((pitch - 440.0).abs() < 10.0, "pitch {}", pitch);

        let zcr = value(set, FeatureName::ZeroCrossingRate);
        assert!((zcr - 0.055).abs() < 0.0055, "zcr {}", zcr);

        // Centroid of a pure tone sits close to the tone
        let centroid = value(set, FeatureName::SpectralCentroid);
        assert!(centroid > 300.0 && centroid < 800.0, "centroid {}", centroid);

        let flatness = value(set, FeatureName::SpectralFlatness);
        assert!(flatness < 0.2, "flatness {}", flatness);
        assert!(value(set, FeatureName::MelSpectrogramMean) > 0.0);
    }

    #[test]
    fn test_noise_is_flatter_and_busier_than_sine() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let sine = extractor
            .extract_all(&signal(sine_wave(16_000, 300.0, 1.0, 0.5), 16_000))
            .into_result()
            .unwrap();
        let noise = extractor
            .extract_all(&signal(white_noise(16_000, 1.0, 0.5, 11), 16_000))
            .into_result()
            .unwrap();

        assert!(value(&noise, FeatureName::ZeroCrossingRate) > 0.3);
        assert!(value(&sine, FeatureName::ZeroCrossingRate) < 0.1);
        assert!(
            value(&noise, FeatureName::SpectralFlatness) > value(&sine, FeatureName::SpectralFlatness)
        );
        assert!(
            value(&noise, FeatureName::SpectralRolloff) > value(&sine, FeatureName::SpectralRolloff)
        );
        assert!(
            value(&noise, FeatureName::SpectralBandwidth)
                > value(&sine, FeatureName::SpectralBandwidth)
        );
    }

    #[test]
    fn test_silence_leaves_voice_features_undefined() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let report = extractor.extract_all(&signal(vec![0.0; 16_000], 16_000));
        assert!(report.is_complete());
        let set = &report.features;

        for name in [
            FeatureName::FundamentalFrequency,
            FeatureName::Formant1,
            FeatureName::Formant2,
            FeatureName::Hnr,
        ] {
            assert_eq!(set.get(name), Some(FeatureValue::Undefined), "{}", name);
        }
        assert_eq!(value(set, FeatureName::SpectralCentroid), 0.0);
        assert!((value(set, FeatureName::SpectralFlatness) - 1.0).abs() < 1e-9);
        assert_eq!(value(set, FeatureName::ZeroCrossingRate), 0.0);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let input = signal(white_noise(22_050, 0.5, 0.3, 5), 22_050);
        let first = extractor.extract_all(&input).into_result().unwrap();
        let second = extractor.extract_all(&input).into_result().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let input = Arc::new(signal(sine_wave(16_000, 220.0, 1.0, 0.4), 16_000));

        let sequential = extractor.extract_all(&input).into_result().unwrap();
        let concurrent = extractor
            .extract_concurrent(Arc::clone(&input), Duration::from_secs(30))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_concurrent_timeout() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let input = Arc::new(signal(white_noise(16_000, 5.0, 0.3, 9), 16_000));

        let result = extractor
            .extract_concurrent(input, Duration::from_nanos(1))
            .await;
        assert!(matches!(result, Err(AnalysisError::Timeout { .. })));
    }
}
