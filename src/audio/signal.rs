// AudioSignal - immutable mono waveform handed to the feature extractors

use crate::error::AudioError;

/// Decoded mono audio with its native sample rate
///
/// Samples are normalized to roughly [-1.0, 1.0]. A signal can only be built
/// when its duration exceeds the configured minimum, so every extractor may
/// rely on having at least that much audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Build a signal, rejecting empty rates, non-finite samples and clips that
    /// are not longer than `min_duration_secs`
    pub fn new(
        samples: Vec<f32>,
        sample_rate: u32,
        min_duration_secs: f64,
    ) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::Decode {
                reason: "sample rate is zero".to_string(),
            });
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(AudioError::Decode {
                reason: "stream contains non-finite samples".to_string(),
            });
        }

        let duration_secs = samples.len() as f64 / sample_rate as f64;
        if duration_secs <= min_duration_secs {
            return Err(AudioError::TooShort {
                duration_secs,
                minimum_secs: min_duration_secs,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
