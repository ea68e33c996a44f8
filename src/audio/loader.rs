//! Signal loader
//!
//! Decodes uploaded bytes into a mono [`AudioSignal`] at the file's native
//! sample rate. WAV goes through `hound`; every other container (MP3, FLAC,
//! OGG, ...) and any WAV variant hound rejects goes through `symphonia`.

use std::io::{Cursor, Read};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::AudioSignal;
use crate::error::AudioError;

/// Interleaved-to-mono decode result before validation
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Decodes audio bytes and enforces the minimum duration
#[derive(Debug, Clone)]
pub struct SignalLoader {
    min_duration_secs: f64,
}

impl SignalLoader {
    pub fn new(min_duration_secs: f64) -> Self {
        Self { min_duration_secs }
    }

    /// Decode `bytes`, using `extension_hint` (e.g. "mp3") to guide probing
    ///
    /// # Errors
    /// * `AudioError::Decode` - not a supported encoding, or no samples
    /// * `AudioError::TooShort` - duration not above the minimum
    pub fn load(
        &self,
        bytes: &[u8],
        extension_hint: Option<&str>,
    ) -> Result<AudioSignal, AudioError> {
        let decoded = decode(bytes, extension_hint)?;

        tracing::debug!(
            sample_rate = decoded.sample_rate,
            total_samples = decoded.samples.len(),
            "Audio decoded"
        );

        AudioSignal::new(decoded.samples, decoded.sample_rate, self.min_duration_secs)
    }

    /// Read and decode a file, taking the hint from its extension
    pub fn load_file(&self, path: &Path) -> Result<AudioSignal, AudioError> {
        let bytes = std::fs::read(path)?;
        let hint = path.extension().and_then(|ext| ext.to_str());
        self.load(&bytes, hint)
    }
}

fn decode(bytes: &[u8], extension_hint: Option<&str>) -> Result<DecodedAudio, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::Decode {
            reason: "empty input".to_string(),
        });
    }

    let hinted_wav = extension_hint
        .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
        .unwrap_or(false);

    if hinted_wav || has_wav_header(bytes) {
        match decode_wav(bytes) {
            Ok(decoded) => return Ok(decoded),
            Err(reason) => {
                tracing::debug!(%reason, "hound rejected WAV input, falling back to symphonia");
            }
        }
    }

    decode_with_symphonia(bytes, extension_hint)
}

fn has_wav_header(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, String> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|err| err.to_string())?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| err.to_string())?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => read_int_samples::<_, i8>(&mut reader, i8::MAX as f32)?,
            16 => read_int_samples::<_, i16>(&mut reader, i16::MAX as f32)?,
            24 => read_int_samples::<_, i32>(&mut reader, 8_388_607.0)?,
            32 => read_int_samples::<_, i32>(&mut reader, i32::MAX as f32)?,
            other => return Err(format!("unsupported bits per sample {}", other)),
        },
    };

    Ok(DecodedAudio {
        samples: downmix(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

fn read_int_samples<R, S>(reader: &mut hound::WavReader<R>, max: f32) -> Result<Vec<f32>, String>
where
    R: Read,
    S: hound::Sample + Into<i32>,
{
    reader
        .samples::<S>()
        .map(|sample| {
            sample
                .map(|value| {
                    let value: i32 = value.into();
                    value as f32 / max
                })
                .map_err(|err| err.to_string())
        })
        .collect()
}

fn decode_with_symphonia(
    bytes: &[u8],
    extension_hint: Option<&str>,
) -> Result<DecodedAudio, AudioError> {
    let decode_err = |reason: String| AudioError::Decode { reason };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| decode_err(format!("unrecognised format: {}", err)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| decode_err(format!("unsupported codec: {}", err)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(decode_err(format!("error reading packet: {}", err))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frame: skip it, the rest of the stream is still usable
            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(err) => return Err(decode_err(format!("decoder failure: {}", err))),
        };

        let spec = *decoded.spec();
        if sample_rate.is_none() {
            sample_rate = Some(spec.rate);
        }
        let channels = spec.channels.count();

        let needs_alloc = sample_buf
            .as_ref()
            .map(|buf| buf.capacity() < decoded.capacity() * channels)
            .unwrap_or(true);
        if needs_alloc {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend(downmix(buf.samples(), channels));
        }
    }

    let sample_rate = sample_rate.ok_or_else(|| decode_err("sample rate unknown".to_string()))?;
    if samples.is_empty() {
        return Err(decode_err("stream contains no audio samples".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved channels into a mono signal
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
