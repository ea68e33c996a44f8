// Spectral module - Frequency-domain feature extraction
//
// This module computes per-frame spectral descriptors from magnitude spectra.
// Extractors average them over all frames of the spectrogram.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

/// Floor applied to power values before taking logarithms
const POWER_FLOOR: f64 = 1e-10;

/// Spectral feature computation functions
pub struct SpectralFeatures {
    /// Centre frequency of every bin in Hz
    frequencies: Vec<f64>,
    rolloff_percent: f64,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `frequencies` - Bin centre frequencies matching the spectra passed in
    /// * `rolloff_percent` - Fraction of magnitude below the rolloff frequency
    pub fn new(frequencies: Vec<f64>, rolloff_percent: f64) -> Self {
        Self {
            frequencies,
            rolloff_percent,
        }
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// # Returns
    /// Spectral centroid in Hz, 0.0 for a silent frame
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f64 {
        let magnitude_sum: f64 = spectrum.iter().map(|&m| m as f64).sum();
        if magnitude_sum <= POWER_FLOOR {
            return 0.0;
        }

        let weighted_sum: f64 = spectrum
            .iter()
            .zip(&self.frequencies)
            .map(|(&mag, &freq)| freq * mag as f64)
            .sum();

        weighted_sum / magnitude_sum
    }

    /// Compute spectral bandwidth (second-order spread around the centroid)
    ///
    /// Formula: bandwidth = sqrt(Σ p_i × (f_i - centroid)²), p = |X| / Σ|X|
    pub fn compute_bandwidth(&self, spectrum: &[f32], centroid: f64) -> f64 {
        let magnitude_sum: f64 = spectrum.iter().map(|&m| m as f64).sum();
        if magnitude_sum <= POWER_FLOOR {
            return 0.0;
        }

        let spread: f64 = spectrum
            .iter()
            .zip(&self.frequencies)
            .map(|(&mag, &freq)| (mag as f64 / magnitude_sum) * (freq - centroid).powi(2))
            .sum();

        spread.sqrt()
    }

    /// Compute spectral flatness (tonality measure)
    ///
    /// Formula: flatness = geometric_mean(P) / arithmetic_mean(P), with the
    /// power spectrum P floored at 1e-10. A silent frame is perfectly flat.
    ///
    /// # Returns
    /// Spectral flatness (0.0 to 1.0)
    pub fn compute_flatness(&self, spectrum: &[f32]) -> f64 {
        if spectrum.is_empty() {
            return 0.0;
        }

        let n = spectrum.len() as f64;
        let power = spectrum
            .iter()
            .map(|&mag| ((mag as f64) * (mag as f64)).max(POWER_FLOOR));

        let (log_sum, sum) = power.fold((0.0, 0.0), |(log_sum, sum), p| (log_sum + p.ln(), sum + p));
        let geometric_mean = (log_sum / n).exp();
        let arithmetic_mean = sum / n;

        (geometric_mean / arithmetic_mean).min(1.0)
    }

    /// Compute spectral rolloff
    ///
    /// Lowest bin frequency at which the cumulative magnitude reaches
    /// `rolloff_percent` of the frame total.
    ///
    /// # Returns
    /// Rolloff frequency in Hz, 0.0 for a silent frame
    pub fn compute_rolloff(&self, spectrum: &[f32]) -> f64 {
        let total: f64 = spectrum.iter().map(|&m| m as f64).sum();
        if total <= POWER_FLOOR {
            return 0.0;
        }

        let threshold = self.rolloff_percent * total;
        let mut cumulative = 0.0;
        for (&mag, &freq) in spectrum.iter().zip(&self.frequencies) {
            cumulative += mag as f64;
            if cumulative >= threshold {
                return freq;
            }
        }

        self.frequencies.last().copied().unwrap_or(0.0)
    }
}
