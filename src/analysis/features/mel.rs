// Mel module - Slaney-style mel filterbank
//
// Triangular filters equally spaced on the Slaney mel scale (linear below
// 1 kHz, logarithmic above), area-normalized so every band has equal energy
// weight. Applied to power spectra.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Dense `n_mels × n_bins` filterbank
pub struct MelFilterbank {
    weights: Vec<Vec<f64>>,
}

impl MelFilterbank {
    /// Build filters covering 0 Hz to Nyquist for spectra with bins at `frequencies`
    pub fn new(n_mels: usize, sample_rate: u32, frequencies: &[f64]) -> Self {
        let mel_max = hz_to_mel(sample_rate as f64 / 2.0);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (lower_edge, center, upper_edge) = (edges[m], edges[m + 1], edges[m + 2]);
                let norm = 2.0 / (upper_edge - lower_edge);
                frequencies
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower_edge) / (center - lower_edge);
                        let falling = (upper_edge - f) / (upper_edge - center);
                        rising.min(falling).max(0.0) * norm
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    /// Project a power spectrum onto the mel bands
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|band| band.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}
