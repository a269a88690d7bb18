//! Canonical 16-bit PCM WAV codec
//!
//! The exported loop is always written with the same 44-byte header layout
//! so any standard decoder can read it. Decoding accepts only that layout.
//!
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  file length - 8
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16
//!     20     2  1 (PCM)
//!     22     2  channels
//!     24     4  sample rate
//!     28     4  byte rate = rate * channels * 2
//!     32     2  block align = channels * 2
//!     34     2  16 bits per sample
//!     36     4  "data"
//!     40     4  frames * channels * 2
//!     44     -  interleaved little-endian i16 samples
//! ```

use crate::engine::buffer::SampleBuffer;
use crate::error::{LoopError, Result};

/// MIME type of the encoded container
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the canonical header in bytes
pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: usize = 2;
const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;
const FULL_SCALE: f32 = 32767.0;

/// Quantize one sample: `round(clamp(sample, -1, 1) * 32767)`
#[inline]
pub fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * FULL_SCALE).round() as i16
}

/// Inverse of [`quantize`]
#[inline]
pub fn dequantize(value: i16) -> f32 {
    value as f32 / FULL_SCALE
}

/// Serialize a buffer to canonical WAV bytes
///
/// # Errors
/// * `InvalidDimensions` - if the channel count or data size does not fit the
///   16/32-bit header fields
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let channels = u16::try_from(buffer.channel_count())
        .ok()
        .filter(|&c| c > 0 && (c as usize) * BYTES_PER_SAMPLE <= u16::MAX as usize)
        .ok_or_else(|| {
            LoopError::dimensions(
                "encode",
                format!("{} channels do not fit a WAV header", buffer.channel_count()),
            )
        })?;

    let block_align = channels as usize * BYTES_PER_SAMPLE;
    let data_len = buffer
        .frame_count()
        .checked_mul(block_align)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(HEADER_LEN as u32 - 8).is_some())
        .ok_or_else(|| {
            LoopError::dimensions(
                "encode",
                format!(
                    "{} frames exceed the 4 GiB WAV data limit",
                    buffer.frame_count()
                ),
            )
        })?;
    let byte_rate = buffer
        .sample_rate()
        .checked_mul(block_align as u32)
        .ok_or_else(|| {
            LoopError::dimensions(
                "encode",
                format!("byte rate overflows at {} Hz", buffer.sample_rate()),
            )
        })?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(data_len + HEADER_LEN as u32 - 8).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..buffer.frame_count() {
        for channel in buffer.channels() {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    Ok(bytes)
}

/// Parse canonical WAV bytes back into a buffer
///
/// # Errors
/// * `MalformedContainer` - if any marker, size or format field disagrees
///   with the canonical layout
pub fn decode(bytes: &[u8]) -> Result<SampleBuffer> {
    if bytes.len() < HEADER_LEN {
        return Err(LoopError::malformed(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    expect_tag(bytes, 0, b"RIFF")?;
    expect_tag(bytes, 8, b"WAVE")?;
    expect_tag(bytes, 12, b"fmt ")?;
    expect_tag(bytes, 36, b"data")?;

    let riff_len = read_u32(bytes, 4) as usize;
    if riff_len != bytes.len() - 8 {
        return Err(LoopError::malformed(format!(
            "RIFF size {} does not match file length {} - 8",
            riff_len,
            bytes.len()
        )));
    }

    let fmt_len = read_u32(bytes, 16);
    if fmt_len != FMT_CHUNK_LEN {
        return Err(LoopError::malformed(format!(
            "fmt chunk size {} (expected {})",
            fmt_len, FMT_CHUNK_LEN
        )));
    }

    let format_tag = read_u16(bytes, 20);
    if format_tag != PCM_FORMAT_TAG {
        return Err(LoopError::malformed(format!(
            "format tag {} is not PCM",
            format_tag
        )));
    }

    let channels = read_u16(bytes, 22) as usize;
    let sample_rate = read_u32(bytes, 24);
    let byte_rate = read_u32(bytes, 28);
    let block_align = read_u16(bytes, 32) as usize;
    let bits = read_u16(bytes, 34);

    if bits != BITS_PER_SAMPLE {
        return Err(LoopError::malformed(format!(
            "{}-bit samples (only 16-bit is supported)",
            bits
        )));
    }
    if channels == 0 || sample_rate == 0 {
        return Err(LoopError::malformed(format!(
            "{} channels at {} Hz",
            channels, sample_rate
        )));
    }
    if block_align != channels * BYTES_PER_SAMPLE {
        return Err(LoopError::malformed(format!(
            "block align {} for {} channels",
            block_align, channels
        )));
    }
    if byte_rate as u64 != sample_rate as u64 * block_align as u64 {
        return Err(LoopError::malformed(format!(
            "byte rate {} for {} Hz x {} bytes",
            byte_rate, sample_rate, block_align
        )));
    }

    let data_len = read_u32(bytes, 40) as usize;
    let payload = &bytes[HEADER_LEN..];
    if data_len != payload.len() {
        return Err(LoopError::malformed(format!(
            "data chunk declares {} bytes but {} follow the header",
            data_len,
            payload.len()
        )));
    }
    if data_len == 0 || data_len % block_align != 0 {
        return Err(LoopError::malformed(format!(
            "data chunk of {} bytes is not a whole number of {}-byte frames",
            data_len, block_align
        )));
    }

    let frames = data_len / block_align;
    let mut channel_data = vec![Vec::with_capacity(frames); channels];
    for frame in payload.chunks_exact(block_align) {
        for (channel, sample) in channel_data.iter_mut().zip(frame.chunks_exact(2)) {
            channel.push(dequantize(i16::from_le_bytes([sample[0], sample[1]])));
        }
    }

    SampleBuffer::from_channels(channel_data, sample_rate)
}

fn expect_tag(bytes: &[u8], offset: usize, tag: &[u8; 4]) -> Result<()> {
    if &bytes[offset..offset + 4] != tag {
        return Err(LoopError::malformed(format!(
            "expected '{}' marker at offset {}",
            String::from_utf8_lossy(tag),
            offset
        )));
    }
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ============================================================================
// Tests
// ============================================================================
