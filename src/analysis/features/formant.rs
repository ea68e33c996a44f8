// Formant module - vocal tract resonances from linear prediction
//
// One analysis frame centred at the signal midpoint is decimated to a
// sampling rate of about twice the maximum formant, pre-emphasized, Hann
// windowed and fitted with an all-pole model by Burg's method. The poles of
// that model are the resonances: a root z of the prediction polynomial maps to
//
//   frequency = arg(z) · fs / 2π
//   bandwidth = -ln|z| · fs / π
//
// Roots are found with the Durand-Kerner iteration.
//
// References:
// - Collomb, C. (2009). Burg's method, algorithm and recursion
// - Markel, J. & Gray, A. (1976). Linear Prediction of Speech

use rustfft::num_complex::Complex;

use super::fft::centered_window;
use crate::config::AnalysisConfig;

/// Analysis frame duration in seconds
const FRAME_SECS: f64 = 0.05;

/// Pre-emphasis corner frequency in Hz
const PRE_EMPHASIS_HZ: f64 = 50.0;

/// Resonances below this frequency are treated as spectral tilt
const MIN_FORMANT_HZ: f64 = 90.0;

/// Wider resonances are not formants
const MAX_BANDWIDTH_HZ: f64 = 400.0;

const MAX_ITERATIONS: usize = 500;
const CONVERGENCE: f64 = 1e-12;

/// Formant tracker for a single frame
pub struct FormantTracker {
    order: usize,
    max_formant_hz: f64,
}

impl FormantTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            order: 2 * config.formant_count.max(1),
            max_formant_hz: config.max_formant_hz,
        }
    }

    /// Formant frequencies in ascending order
    ///
    /// Empty when the frame is silent or the model cannot be fitted.
    pub fn formants(&self, samples: &[f32], sample_rate: u32) -> Vec<f64> {
        let factor = ((sample_rate as f64 / (2.0 * self.max_formant_hz)).floor() as usize).max(1);
        let rate = sample_rate as f64 / factor as f64;

        let decimated = decimate(samples, factor);
        let frame_length = ((FRAME_SECS * rate).round() as usize).max(self.order + 2);
        let frame = centered_window(&decimated, decimated.len() / 2, frame_length);

        let prepared = prepare_frame(&frame, rate);
        let Some(coefficients) = burg(&prepared, self.order) else {
            return Vec::new();
        };
        let Some(roots) = polynomial_roots(&coefficients) else {
            return Vec::new();
        };

        let mut formants: Vec<f64> = roots
            .into_iter()
            .filter(|z| z.im > 0.0)
            .filter_map(|z| {
                // Burg's model is minimum phase, reflect any numerical stragglers
                let z = if z.norm() > 1.0 { z.conj().inv() } else { z };
                let frequency = z.arg() * rate / (2.0 * std::f64::consts::PI);
                let bandwidth = -z.norm().ln() * rate / std::f64::consts::PI;
                let accepted = frequency > MIN_FORMANT_HZ
                    && frequency < self.max_formant_hz
                    && bandwidth < MAX_BANDWIDTH_HZ;
                accepted.then_some(frequency)
            })
            .collect();

        formants.sort_by(f64::total_cmp);
        formants
    }

    /// First and second formant, None when fewer than two were found
    pub fn first_two(&self, samples: &[f32], sample_rate: u32) -> Option<(f64, f64)> {
        match self.formants(samples, sample_rate).as_slice() {
            [f1, f2, ..] => Some((*f1, *f2)),
            _ => None,
        }
    }
}

/// Low-pass FIR half width in output samples
const LOWPASS_HALF_WIDTH: usize = 8;

/// Hann-windowed sinc with its cutoff at the decimated Nyquist frequency, unit DC gain
fn lowpass_taps(factor: usize) -> Vec<f64> {
    use std::f64::consts::PI;

    let half = LOWPASS_HALF_WIDTH * factor;
    let len = 2 * half + 1;
    let cutoff = 0.5 / factor as f64;

    let taps: Vec<f64> = (0..len)
        .map(|n| {
            let m = n as f64 - half as f64;
            let sinc = if n == half {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * m).sin() / (PI * m)
            };
            let window = 0.5 - 0.5 * (2.0 * PI * n as f64 / (len - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let gain: f64 = taps.iter().sum();
    taps.into_iter().map(|tap| tap / gain).collect()
}

/// Anti-aliased decimation by an integer factor, zero padded at the edges
fn decimate(samples: &[f32], factor: usize) -> Vec<f32> {
    if factor <= 1 {
        return samples.to_vec();
    }
    let taps = lowpass_taps(factor);
    let half = taps.len() / 2;

    (0..samples.len())
        .step_by(factor)
        .map(|center| {
            taps.iter()
                .enumerate()
                .filter_map(|(k, &tap)| {
                    let index = (center + k).checked_sub(half)?;
                    samples.get(index).map(|&s| tap * s as f64)
                })
                .sum::<f64>() as f32
        })
        .collect()
}

/// Pre-emphasis followed by a Hann window
fn prepare_frame(frame: &[f32], rate: f64) -> Vec<f64> {
    let alpha = (-2.0 * std::f64::consts::PI * PRE_EMPHASIS_HZ / rate).exp();
    let n = frame.len();
    (0..n)
        .map(|i| {
            let previous = if i > 0 { frame[i - 1] as f64 } else { 0.0 };
            let emphasized = frame[i] as f64 - alpha * previous;
            let w = 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            emphasized * w
        })
        .collect()
}

/// Burg's method, returns [1, a1, .., ap] with A(z) = 1 + Σ a_k z^-k
fn burg(x: &[f64], order: usize) -> Option<Vec<f64>> {
    let n = x.len();
    if n <= order + 1 {
        return None;
    }

    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;
    let mut forward = x.to_vec();
    let mut backward = x.to_vec();

    let mut denominator: f64 =
        x.iter().map(|v| 2.0 * v * v).sum::<f64>() - x[0] * x[0] - x[n - 1] * x[n - 1];

    for k in 0..order {
        if denominator <= f64::EPSILON {
            return None;
        }

        let dot: f64 = (0..n - k - 1).map(|i| forward[i + k + 1] * backward[i]).sum();
        let mu = -2.0 * dot / denominator;

        for i in 0..=(k + 1) / 2 {
            let low = a[i] + mu * a[k + 1 - i];
            let high = a[k + 1 - i] + mu * a[i];
            a[i] = low;
            a[k + 1 - i] = high;
        }

        for i in 0..n - k - 1 {
            let f = forward[i + k + 1] + mu * backward[i];
            let b = backward[i] + mu * forward[i + k + 1];
            forward[i + k + 1] = f;
            backward[i] = b;
        }

        denominator = (1.0 - mu * mu) * denominator
            - forward[k + 1] * forward[k + 1]
            - backward[n - k - 2] * backward[n - k - 2];
    }

    a.iter().all(|c| c.is_finite()).then_some(a)
}

/// Roots of the monic polynomial with `coefficients` in descending powers
fn polynomial_roots(coefficients: &[f64]) -> Option<Vec<Complex<f64>>> {
    let degree = coefficients.len().checked_sub(1).filter(|&d| d > 0)?;
    let evaluate = |z: Complex<f64>| {
        coefficients
            .iter()
            .fold(Complex::new(0.0, 0.0), |acc, &c| acc * z + c)
    };

    let seed = Complex::new(0.4, 0.9);
    let mut roots: Vec<Complex<f64>> = (0..degree).map(|k| seed.powu(k as u32)).collect();

    for _ in 0..MAX_ITERATIONS {
        let mut largest_step = 0.0f64;
        for i in 0..degree {
            let denominator = roots
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Complex::new(1.0, 0.0), |acc, (_, &r)| acc * (roots[i] - r));
            if denominator.norm() == 0.0 {
                continue;
            }
            let step = evaluate(roots[i]) / denominator;
            roots[i] -= step;
            largest_step = largest_step.max(step.norm());
        }
        if largest_step < CONVERGENCE {
            break;
        }
    }

    roots
        .iter()
        .all(|z| z.re.is_finite() && z.im.is_finite())
        .then_some(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sine_wave;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Two-pole resonator applied in place
    fn resonate(signal: &mut [f64], frequency: f64, bandwidth: f64, rate: f64) {
        let r = (-std::f64::consts::PI * bandwidth / rate).exp();
        let c1 = 2.0 * r * (2.0 * std::f64::consts::PI * frequency / rate).cos();
        let c2 = -r * r;
        let (mut y1, mut y2) = (0.0, 0.0);
        for sample in signal.iter_mut() {
            let y = *sample + c1 * y1 + c2 * y2;
            y2 = y1;
            y1 = y;
            *sample = y;
        }
    }

    /// Pulse train shaped by a low-pass source and three resonances
    fn synthetic_vowel(rate: u32, seconds: f64) -> Vec<f32> {
        let len = (rate as f64 * seconds) as usize;
        let period = rate as usize / 100;
        let mut signal: Vec<f64> = (0..len)
            .map(|i| if i % period == 0 { 1.0 } else { 0.0 })
            .collect();

        let mut previous = 0.0;
        for sample in signal.iter_mut() {
            previous = *sample + 0.9 * previous;
            *sample = previous;
        }

        for (frequency, bandwidth) in [(700.0, 80.0), (1200.0, 90.0), (2500.0, 120.0)] {
            resonate(&mut signal, frequency, bandwidth, rate as f64);
        }

        let peak = signal.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        signal.iter().map(|s| (s / peak * 0.8) as f32).collect()
    }

    #[test]
    fn test_resonances_are_recovered() {
        let tracker = FormantTracker::new(&AnalysisConfig::default());
        let vowel = synthetic_vowel(11_025, 0.5);
        let formants = tracker.formants(&vowel, 11_025);

        assert!(
            formants.iter().any(|f| (f - 700.0).abs() < 120.0),
            "no F1 candidate in {:?}",
            formants
        );
        assert!(
            formants.iter().any(|f| (f - 1200.0).abs() < 150.0),
            "no F2 candidate in {:?}",
            formants
        );
        assert!(formants.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_silence_has_no_formants() {
        let tracker = FormantTracker::new(&AnalysisConfig::default());
        let silence = vec![0.0f32; 16_000];
        assert!(tracker.formants(&silence, 16_000).is_empty());
        assert!(tracker.first_two(&silence, 16_000).is_none());
    }

    #[test]
    fn test_burg_recovers_ar2_process() {
        // x[n] = 1.3 x[n-1] - 0.6 x[n-2] + e[n]
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = vec![0.0f64; 8000];
        for n in 0..x.len() {
            let x1 = if n >= 1 { x[n - 1] } else { 0.0 };
            let x2 = if n >= 2 { x[n - 2] } else { 0.0 };
            x[n] = 1.3 * x1 - 0.6 * x2 + rng.gen_range(-1.0..1.0);
        }
        let a = burg(&x, 2).unwrap();
        assert!((a[1] + 1.3).abs() < 0.05, "{:?}", a);
        assert!((a[2] - 0.6).abs() < 0.05, "{:?}", a);
    }

    #[test]
    fn test_polynomial_roots_of_quadratic() {
        // z² - 3z + 2 = (z - 1)(z - 2)
        let mut roots: Vec<f64> = polynomial_roots(&[1.0, -3.0, 2.0])
            .unwrap()
            .iter()
            .map(|z| z.re)
            .collect();
        roots.sort_by(f64::total_cmp);
        assert!((roots[0] - 1.0).abs() < 1e-9);
        assert!((roots[1] - 2.0).abs() < 1e-9);
    }

    fn rms(samples: &[f32]) -> f64 {
        (samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
    }

    #[test]
    fn test_decimate_preserves_level() {
        let decimated = decimate(&vec![0.5f32; 400], 4);
        assert_eq!(decimated.len(), 100);
        for value in &decimated[LOWPASS_HALF_WIDTH..100 - LOWPASS_HALF_WIDTH] {
            assert!((value - 0.5).abs() < 1e-5, "got {}", value);
        }
        assert_eq!(decimate(&[1.0, 2.0], 1), vec![1.0, 2.0]);
    }

    #[test]
    fn test_decimate_rejects_aliasing_band() {
        // 44.1 kHz down to 11.025 kHz: 9 kHz would fold back to 2 kHz
        let factor = 4;
        let interior = |x: &[f32]| x[LOWPASS_HALF_WIDTH..x.len() - LOWPASS_HALF_WIDTH].to_vec();

        let speech_band = sine_wave(44_100, 500.0, 0.5, 0.5);
        let kept = interior(&decimate(&speech_band, factor));
        let ratio = rms(&kept) / rms(&speech_band);
        assert!(ratio > 0.9, "500 Hz kept {}", ratio);

        let above_nyquist = sine_wave(44_100, 9_000.0, 0.5, 0.5);
        let folded = interior(&decimate(&above_nyquist, factor));
        let ratio = rms(&folded) / rms(&above_nyquist);
        assert!(ratio < 0.05, "9 kHz leaked {}", ratio);
    }
}
