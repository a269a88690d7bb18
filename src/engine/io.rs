//! Audio file I/O for Seamloop
//!
//! Input files of any bit depth hound understands are decoded through the
//! [`Decoder`] trait. Exported loops are always canonical 16-bit WAV produced
//! by [`crate::engine::wav`], written to disk with a checksum or wrapped in a
//! data URL for sharing.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hound::{SampleFormat, WavReader};
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::engine::buffer::SampleBuffer;
use crate::engine::wav::{dequantize, WAV_MIME_TYPE};
use crate::error::{LoopError, Result};

/// Host-provided audio decoder
pub trait Decoder {
    /// Decode a complete file image into planar float samples
    ///
    /// # Errors
    /// * `DecodeFailed` - if the bytes are not audio this decoder understands
    /// * `AudioTooShort` - if the decoded audio is shorter than 0.2 seconds
    fn decode(&self, bytes: &[u8]) -> Result<SampleBuffer>;
}

/// WAV decoder backed by hound
///
/// Accepts 8/16/24/32-bit integer and 32-bit float files at any sample rate
/// and channel count. 16-bit data is scaled exactly like the export codec so
/// an exported loop decodes to the same values.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavFileDecoder;

impl WavFileDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Read and decode a file from disk
    pub fn decode_file(&self, path: &Path) -> Result<SampleBuffer> {
        info!("[IO] Decoding {}", path.display());
        let bytes = fs::read(path)?;
        self.decode(&bytes)
    }
}

impl Decoder for WavFileDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SampleBuffer> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| decode_failed("Failed to open WAV data", e))?;

        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 || spec.sample_rate == 0 {
            return Err(LoopError::DecodeFailed {
                reason: format!(
                    "Unusable format: {} channels at {} Hz",
                    channels, spec.sample_rate
                ),
                source: None,
            });
        }

        let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
        if interleaved.len() < channels {
            return Err(LoopError::DecodeFailed {
                reason: "File contains no audio frames".to_string(),
                source: None,
            });
        }

        let buffer =
            SampleBuffer::from_channels(deinterleave(&interleaved, channels), spec.sample_rate)?;
        if !buffer.is_finite() {
            return Err(LoopError::DecodeFailed {
                reason: "File contains NaN or infinite samples".to_string(),
                source: None,
            });
        }
        buffer.ensure_min_duration()?;

        debug!(
            "[IO] Decoded {} frames, {} channels, {} Hz, {}-bit",
            buffer.frame_count(),
            channels,
            spec.sample_rate,
            spec.bits_per_sample
        );
        Ok(buffer)
    }
}

/// Download name for an exported loop: `<stem><suffix>.wav`
///
/// # Example
/// ```
/// use std::path::Path;
/// use seamloop::engine::loop_file_name;
///
/// assert_eq!(loop_file_name(Path::new("take 3.mp3"), "_loop"), "take 3_loop.wav");
/// ```
pub fn loop_file_name(input: &Path, suffix: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "audio".to_string());
    format!("{}{}.wav", stem, suffix)
}

/// Wrap WAV bytes in a `data:audio/wav;base64,` URL
pub fn to_data_url(wav_bytes: &[u8]) -> String {
    format!("data:{};base64,{}", WAV_MIME_TYPE, STANDARD.encode(wav_bytes))
}

/// Write WAV bytes to `path`, returning the SHA-256 of the written data as hex
pub fn write_wav(path: &Path, wav_bytes: &[u8]) -> Result<String> {
    fs::write(path, wav_bytes)?;
    let checksum = sha256_hex(wav_bytes);
    info!(
        "[IO] Wrote {} bytes to {} (sha256 {})",
        wav_bytes.len(),
        path.display(),
        checksum
    );
    Ok(checksum)
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn decode_failed(context: &str, error: hound::Error) -> LoopError {
    LoopError::DecodeFailed {
        reason: format!("{}: {}", context, error),
        source: Some(Box::new(error)),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_failed("Failed to read float samples", e)),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_failed("Failed to read 8-bit samples", e)),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(dequantize))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_failed("Failed to read 16-bit samples", e)),
        // 24-bit is stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_failed("Failed to read 24-bit samples", e)),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_failed("Failed to read 32-bit int samples", e)),
        (SampleFormat::Int, bits) => Err(LoopError::DecodeFailed {
            reason: format!("Unsupported {}-bit integer audio", bits),
            source: None,
        }),
    }
}

/// De-interleave samples from [L,R,L,R,...] to [[L,L,...], [R,R,...]]
///
/// A trailing partial frame is dropped.
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut result = vec![Vec::with_capacity(frames); channels];

    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in result.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    result
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::wav;
    use approx::assert_abs_diff_eq;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn hound_bytes<F>(spec: WavSpec, frames: usize, mut write: F) -> Vec<u8>
    where
        F: FnMut(&mut WavWriter<&mut Cursor<Vec<u8>>>, usize),
    {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                write(&mut writer, i);
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_deinterleave() {
        let result = deinterleave(&[1.0, -1.0, 2.0, -2.0, 3.0], 2);
        assert_eq!(result, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
    }

    #[test]
    fn test_decode_own_export_matches_codec() {
        let samples: Vec<f32> = (0..100).map(|i| (i as f32 * 0.05).sin() * 0.8).collect();
        let buffer = SampleBuffer::from_channels(vec![samples.clone(), samples], 400).unwrap();
        let bytes = wav::encode(&buffer).unwrap();

        let via_hound = WavFileDecoder::new().decode(&bytes).unwrap();
        let via_codec = wav::decode(&bytes).unwrap();
        assert_eq!(via_hound, via_codec);
    }

    #[test]
    fn test_decode_24bit() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let bytes = hound_bytes(spec, 500, |w, _| w.write_sample(4_194_304_i32).unwrap());

        let buffer = WavFileDecoder::new().decode(&bytes).unwrap();
        assert_eq!(buffer.frame_count(), 500);
        assert_abs_diff_eq!(buffer.channel(0)[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_float() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 1000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = hound_bytes(spec, 300, |w, _| {
            w.write_sample(0.25_f32).unwrap();
            w.write_sample(-0.75_f32).unwrap();
        });

        let buffer = WavFileDecoder::new().decode(&bytes).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.channel(0)[10], 0.25);
        assert_eq!(buffer.channel(1)[10], -0.75);
    }

    #[test]
    fn test_decode_rejects_non_finite_float() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = hound_bytes(spec, 300, |w, i| {
            let sample = if i == 150 { f32::NAN } else { 0.1 };
            w.write_sample(sample).unwrap();
        });

        let err = WavFileDecoder::new().decode(&bytes).unwrap_err();
        assert!(matches!(err, LoopError::DecodeFailed { .. }));
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_decode_rejects_short_audio() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = hound_bytes(spec, 150, |w, _| w.write_sample(0_i16).unwrap());
        let err = WavFileDecoder::new().decode(&bytes).unwrap_err();
        assert!(matches!(err, LoopError::AudioTooShort { .. }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = WavFileDecoder::new().decode(b"definitely not audio").unwrap_err();
        assert!(matches!(err, LoopError::DecodeFailed { .. }));
        assert_eq!(err.error_code(), "DECODE_FAILED");
    }

    #[test]
    fn test_decode_file_missing() {
        let dir = tempdir().unwrap();
        let err = WavFileDecoder::new()
            .decode_file(&dir.path().join("missing.wav"))
            .unwrap_err();
        assert!(matches!(err, LoopError::Io(_)));
    }

    #[test]
    fn test_loop_file_name() {
        assert_eq!(loop_file_name(Path::new("drums.wav"), "_loop"), "drums_loop.wav");
        assert_eq!(
            loop_file_name(Path::new("/tmp/my.take.flac"), "_loop"),
            "my.take_loop.wav"
        );
        assert_eq!(loop_file_name(Path::new(""), "_x"), "audio_x.wav");
    }

    #[test]
    fn test_data_url() {
        assert_eq!(to_data_url(b"RIFF"), "data:audio/wav;base64,UklGRg==");
    }

    #[test]
    fn test_write_wav_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let checksum = write_wav(&path, b"abc").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"abc");
        assert_eq!(
            checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
