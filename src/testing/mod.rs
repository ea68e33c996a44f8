//! Deterministic signal generators and WAV encoding for tests and demos.
//!
//! These helpers let unit tests, integration tests and the CLI build audio
//! without shipping binary fixtures.

use std::f32::consts::PI;
use std::io::Cursor;

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Pure sine tone
pub fn sine_wave(sample_rate: u32, frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let len = (sample_rate as f32 * duration_secs).round() as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Uniform white noise in [-amplitude, amplitude], reproducible for a given seed
pub fn white_noise(sample_rate: u32, duration_secs: f32, amplitude: f32, seed: u64) -> Vec<f32> {
    let len = (sample_rate as f32 * duration_secs).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(-amplitude..=amplitude))
        .collect()
}

/// Harmonic tone with 1/k amplitude roll-off, a rough stand-in for a sustained vowel
pub fn harmonic_tone(
    sample_rate: u32,
    fundamental: f32,
    harmonics: usize,
    duration_secs: f32,
) -> Vec<f32> {
    let len = (sample_rate as f32 * duration_secs).round() as usize;
    let nyquist = sample_rate as f32 / 2.0;
    let norm: f32 = (1..=harmonics).map(|k| 1.0 / k as f32).sum();
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (1..=harmonics)
                .filter(|&k| fundamental * (k as f32) < nyquist)
                .map(|k| (2.0 * PI * fundamental * k as f32 * t).sin() / k as f32)
                .sum::<f32>()
                * 0.8
                / norm
        })
        .collect()
}

/// Encode interleaved samples as a 16-bit PCM WAV file in memory
///
/// # Panics
/// Only if hound fails to write into a `Vec`, which does not happen in practice.
pub fn encode_wav(interleaved: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("in-memory WAV writer");
        for &sample in interleaved {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(value).expect("in-memory WAV write");
        }
        writer.finalize().expect("in-memory WAV finalize");
    }
    cursor.into_inner()
}
