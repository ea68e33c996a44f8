// Temporal module - Time-domain feature extraction
//
// This module computes features directly from time-domain audio signals:
// amplitude extremes, zero-crossing rate, frame RMS and the sample-energy
// entropy.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use super::fft::{frame_at, frame_count};

/// Guards log(0) in the entropy sum
const ENTROPY_EPSILON: f64 = 1e-10;

/// Temporal feature computation functions
pub struct TemporalFeatures {
    frame_length: usize,
    hop_length: usize,
}

impl TemporalFeatures {
    /// Create a new temporal features processor
    ///
    /// # Arguments
    /// * `frame_length` - Analysis frame length in samples
    /// * `hop_length` - Step between frames in samples
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            frame_length,
            hop_length: hop_length.max(1),
        }
    }

    /// Largest and smallest absolute sample value
    ///
    /// Both are 0.0 for an empty or all-zero signal.
    pub fn compute_amplitude_range(&self, audio: &[f32]) -> (f64, f64) {
        if audio.is_empty() {
            return (0.0, 0.0);
        }

        audio.iter().fold((0.0f64, f64::INFINITY), |(max, min), &s| {
            let a = s.abs() as f64;
            (max.max(a), min.min(a))
        })
    }

    /// Compute zero-crossing rate (ZCR)
    ///
    /// Per frame: number of sign changes divided by the frame length, with
    /// zero counted as positive. Returns the mean over all frames, so a sine
    /// of frequency f yields roughly 2f / sample_rate.
    pub fn compute_zcr(&self, audio: &[f32]) -> f64 {
        let n_frames = frame_count(audio.len(), self.hop_length);
        let total: f64 = (0..n_frames)
            .map(|i| {
                let frame = frame_at(audio, i, self.frame_length, self.hop_length);
                let crossings = frame
                    .windows(2)
                    .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                    .count();
                crossings as f64 / self.frame_length as f64
            })
            .sum();

        total / n_frames as f64
    }

    /// Mean of per-frame root-mean-square amplitude
    pub fn compute_rms(&self, audio: &[f32]) -> f64 {
        let n_frames = frame_count(audio.len(), self.hop_length);
        let total: f64 = (0..n_frames)
            .map(|i| {
                let frame = frame_at(audio, i, self.frame_length, self.hop_length);
                let energy: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
                (energy / self.frame_length as f64).sqrt()
            })
            .sum();

        total / n_frames as f64
    }

    /// Sample-energy entropy over the raw signal
    ///
    /// Formula: -Σ x² × ln(x² + ε), ε = 1e-10
    pub fn compute_entropy(&self, audio: &[f32]) -> f64 {
        -audio
            .iter()
            .map(|&s| {
                let energy = (s as f64) * (s as f64);
                energy * (energy + ENTROPY_EPSILON).ln()
            })
            .sum::<f64>()
    }
}
