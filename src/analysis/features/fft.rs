// FFT module - framing and short-time Fourier transform
//
// Every frame-based extractor slices the signal through `frame_at`, so all of
// them agree on frame boundaries: frames are centred on multiples of the hop
// length and zero-padded by half a frame at both ends. The magnitude
// spectrogram is computed with a periodic Hann window.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Number of centred frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length.max(1)
}

/// Copy frame `index` out of `samples`, zero-filling outside the signal
pub fn frame_at(samples: &[f32], index: usize, frame_length: usize, hop_length: usize) -> Vec<f32> {
    let center = index * hop_length;
    centered_window(samples, center, frame_length)
}

/// Copy `frame_length` samples centred on `center`, zero-filling outside the signal
pub fn centered_window(samples: &[f32], center: usize, frame_length: usize) -> Vec<f32> {
    let start = center as isize - (frame_length / 2) as isize;
    (0..frame_length)
        .map(|i| {
            let idx = start + i as isize;
            if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            }
        })
        .collect()
}

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / n as f32).cos()))
        .collect()
}

/// STFT processor producing per-frame magnitude spectra
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    frame_length: usize,
    hop_length: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
}

impl Stft {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `frame_length` - Frame and FFT size in samples
    /// * `hop_length` - Step between frames in samples
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(frame_length);

        Self {
            fft,
            frame_length,
            hop_length: hop_length.max(1),
            window: hann_window(frame_length),
        }
    }

    /// Number of positive-frequency bins per spectrum
    pub fn n_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Centre frequency of every bin in Hz
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f64> {
        let bin_width = sample_rate as f64 / self.frame_length as f64;
        (0..self.n_bins()).map(|k| k as f64 * bin_width).collect()
    }

    /// Magnitude spectrum of a single frame (positive frequencies only)
    pub fn magnitude_spectrum(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(&self.window)
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        buffer.resize(self.frame_length, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.n_bins()].iter().map(|c| c.norm()).collect()
    }

    /// Iterate the magnitude spectrogram frame by frame
    pub fn magnitudes<'a>(&'a self, samples: &'a [f32]) -> impl Iterator<Item = Vec<f32>> + 'a {
        (0..frame_count(samples.len(), self.hop_length)).map(move |i| {
            let frame = frame_at(samples, i, self.frame_length, self.hop_length);
            self.magnitude_spectrum(&frame)
        })
    }
}
