// Voice module - pitch and harmonicity from frame periodicity
//
// Both descriptors come from the normalized autocorrelation of each analysis
// frame. For lag l the frame is compared with itself shifted by l samples:
//
//   r(l) = Σ x[i]·x[i+l] / sqrt(Σ x[i]² · Σ x[i+l]²)
//
// so r(l) is 1 for a perfectly periodic frame with period l. The raw
// autocorrelation comes from an FFT and the two energies from prefix sums.
// A frame is voiced when it is loud enough relative to the whole signal and
// its best peak clears the voicing threshold.
//
// Frames sit on the shared hop grid but are sized by time: at least three
// periods of the pitch floor, so the floor holds at any sample rate.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::fft::{frame_at, frame_count};
use crate::config::AnalysisConfig;

/// Peaks within this fraction of the strongest one count as the same candidate,
/// so the shortest such lag wins and octave errors are avoided
const OCTAVE_TOLERANCE: f64 = 0.95;

/// Clamp on r before converting to decibels
const MIN_STRENGTH: f64 = 1e-9;
const MAX_STRENGTH: f64 = 1.0 - 1e-7;

/// Floor periods that must fit in one analysis window
const PERIODS_PER_WINDOW: f64 = 3.0;

/// Periodicity estimate for one voiced frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodicity {
    /// Period in samples, refined by parabolic interpolation
    pub lag: f64,
    /// Normalized autocorrelation at the period (0.0 to 1.0)
    pub strength: f64,
}

impl Periodicity {
    pub fn frequency(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.lag
    }

    /// Harmonics-to-noise ratio in dB
    pub fn hnr_db(&self) -> f64 {
        let r = self.strength.clamp(MIN_STRENGTH, MAX_STRENGTH);
        10.0 * (r / (1.0 - r)).log10()
    }
}

/// Frame-wise periodicity analyser
pub struct VoiceAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    window_length: usize,
    hop_length: usize,
    sample_rate: u32,
    min_lag: usize,
    max_lag: usize,
    voicing_threshold: f64,
    silence_threshold: f64,
}

impl VoiceAnalyzer {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        let floor_window = (PERIODS_PER_WINDOW * rate / config.pitch_floor_hz).ceil() as usize;
        let window_length = config.frame_length.max(floor_window);
        // Zero-pad to avoid circular wrap-around in the autocorrelation
        let fft_size = (2 * window_length).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();

        let max_lag = ((rate / config.pitch_floor_hz).ceil() as usize).min(window_length / 2);
        let min_lag = ((rate / config.pitch_ceiling_hz).floor() as usize).max(2);

        Self {
            fft: planner.plan_fft_forward(fft_size),
            ifft: planner.plan_fft_inverse(fft_size),
            fft_size,
            window_length,
            hop_length: config.hop_length.max(1),
            sample_rate,
            min_lag,
            max_lag,
            voicing_threshold: config.voicing_threshold,
            silence_threshold: config.silence_threshold,
        }
    }

    /// Periodicity of every voiced frame, in frame order
    pub fn voiced_frames(&self, samples: &[f32]) -> Vec<Periodicity> {
        let global_peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if global_peak <= 0.0 {
            return Vec::new();
        }
        let gate = self.silence_threshold as f32 * global_peak;

        (0..frame_count(samples.len(), self.hop_length))
            .filter_map(|i| {
                let frame = frame_at(samples, i, self.window_length, self.hop_length);
                let frame_peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                if frame_peak < gate {
                    return None;
                }
                self.frame_periodicity(&frame)
            })
            .collect()
    }

    /// Median fundamental frequency over voiced frames, None when nothing is voiced
    pub fn median_pitch(&self, samples: &[f32]) -> Option<f64> {
        let mut pitches: Vec<f64> = self
            .voiced_frames(samples)
            .iter()
            .map(|p| p.frequency(self.sample_rate))
            .collect();
        median(&mut pitches)
    }

    /// Mean HNR over voiced frames in dB, None when no frame is periodic
    pub fn mean_hnr(&self, samples: &[f32]) -> Option<f64> {
        let frames = self.voiced_frames(samples);
        if frames.is_empty() {
            return None;
        }
        Some(frames.iter().map(Periodicity::hnr_db).sum::<f64>() / frames.len() as f64)
    }

    fn frame_periodicity(&self, frame: &[f32]) -> Option<Periodicity> {
        if self.max_lag <= self.min_lag + 1 {
            return None;
        }

        let r = self.normalized_autocorrelation(frame);

        // Interior local maxima inside the lag search range
        let peaks: Vec<usize> = (self.min_lag + 1..self.max_lag)
            .filter(|&l| r[l] >= r[l - 1] && r[l] > r[l + 1])
            .collect();

        let best = peaks.iter().map(|&l| r[l]).fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() || best < self.voicing_threshold {
            return None;
        }

        let lag = peaks
            .into_iter()
            .find(|&l| r[l] >= OCTAVE_TOLERANCE * best)?;

        // Parabolic refinement around the integer peak
        let (left, center, right) = (r[lag - 1], r[lag], r[lag + 1]);
        let denom = left - 2.0 * center + right;
        let offset = if denom.abs() > 1e-12 {
            (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let strength = (center - 0.25 * (left - right) * offset).min(1.0);

        Some(Periodicity {
            lag: lag as f64 + offset,
            strength,
        })
    }

    /// r(l) for l in 0..=max_lag (+1 for the refinement neighbour)
    fn normalized_autocorrelation(&self, frame: &[f32]) -> Vec<f64> {
        let n = frame.len();

        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .map(|&s| Complex::new(s as f64, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.ifft.process(&mut buffer);
        let scale = 1.0 / self.fft_size as f64;

        // prefix[k] = Σ_{i<k} x[i]²
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        for &s in frame {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + (s as f64) * (s as f64));
        }

        (0..=(self.max_lag + 1).min(n - 1))
            .map(|lag| {
                let head = prefix[n - lag];
                let tail = prefix[n] - prefix[lag];
                let norm = (head * tail).sqrt();
                if norm > 1e-12 {
                    buffer[lag].re * scale / norm
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Median with the mean-of-middle convention for even counts
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
