//! Sample Buffer Management
//!
//! Provides the in-memory audio representation shared by every stage of the
//! loop pipeline: per-channel `f32` arrays plus a sample rate. Buffers are
//! values; trimming and looping always allocate a new buffer.

use crate::error::{LoopError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Minimum duration of decoded audio and of a trimmed selection (200ms)
pub const MIN_DURATION_SECS: f64 = 0.2;

// ============================================================================
// Selection
// ============================================================================

/// A time range `[start, end]` in seconds over a buffer
///
/// Construction orders the endpoints and clamps negatives to zero, so a
/// `Selection` always satisfies `0 <= start <= end`. The upper bound depends on
/// the buffer and is applied with [`Selection::clamped_to`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Selection {
    start: f64,
    end: f64,
}

impl Selection {
    /// Create a selection from two endpoints in any order
    pub fn new(start: f64, end: f64) -> Self {
        let start = sanitize(start);
        let end = sanitize(end);
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Selection covering a whole buffer
    pub fn full(buffer: &SampleBuffer) -> Self {
        Self::new(0.0, buffer.duration_secs())
    }

    /// Restrict both endpoints to `[0, duration]`
    pub fn clamped_to(self, duration: f64) -> Self {
        let duration = sanitize(duration);
        Self {
            start: self.start.min(duration),
            end: self.end.min(duration),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }

    /// True when the selection has zero width
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `position` lies inside the closed range
    pub fn contains(&self, position: f64) -> bool {
        (self.start..=self.end).contains(&position)
    }
}

fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

// ============================================================================
// Sample Buffer
// ============================================================================

/// Multi-channel floating point audio
///
/// Stores audio as non-interleaved 32-bit floating point samples, one
/// `Vec<f32>` per channel. Every channel holds exactly `frame_count` samples.
///
/// # Example
/// ```
/// use seamloop::engine::SampleBuffer;
///
/// let buffer = SampleBuffer::allocate(2, 44100, 44100).unwrap();
/// assert_eq!(buffer.channel_count(), 2);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    frame_count: usize,
}

impl SampleBuffer {
    /// Create a silent buffer
    ///
    /// # Errors
    /// * `InvalidDimensions` - if `channel_count` or `sample_rate` is zero
    pub fn allocate(channel_count: usize, frame_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(LoopError::dimensions(
                "allocate",
                "channel count must be positive",
            ));
        }
        if sample_rate == 0 {
            return Err(LoopError::dimensions(
                "allocate",
                "sample rate must be positive",
            ));
        }

        Ok(Self {
            channels: vec![vec![0.0_f32; frame_count]; channel_count],
            sample_rate,
            frame_count,
        })
    }

    /// Adopt per-channel sample data produced by a decoder
    ///
    /// # Errors
    /// * `InvalidDimensions` - if there are no channels, the sample rate is
    ///   zero, or the channels differ in length
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(LoopError::dimensions(
                "from_channels",
                "at least one channel is required",
            ));
        };
        if sample_rate == 0 {
            return Err(LoopError::dimensions(
                "from_channels",
                "sample rate must be positive",
            ));
        }

        let frame_count = first.len();
        if let Some((index, ragged)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frame_count)
        {
            return Err(LoopError::dimensions(
                "from_channels",
                format!(
                    "channel {} has {} frames, expected {}",
                    index,
                    ragged.len(),
                    frame_count
                ),
            ));
        }

        Ok(Self {
            channels,
            sample_rate,
            frame_count,
        })
    }

    /// Deep copy used to snapshot the originally decoded audio
    pub fn copy_of(buffer: &SampleBuffer) -> Self {
        buffer.clone()
    }

    /// Copy the frames covered by `selection` into a new buffer
    ///
    /// Frame boundaries are `floor(seconds * sample_rate)`, clamped to the
    /// buffer length.
    ///
    /// # Errors
    /// * `SelectionTooShort` - if the selection covers less than
    ///   [`MIN_DURATION_SECS`]
    pub fn trim(&self, selection: Selection) -> Result<Self> {
        let start_frame = self.seconds_to_frame(selection.start());
        let end_frame = self.seconds_to_frame(selection.end()).max(start_frame);
        let length = end_frame - start_frame;

        if (length as f64) < MIN_DURATION_SECS * self.sample_rate as f64 {
            return Err(LoopError::SelectionTooShort {
                duration_secs: length as f64 / self.sample_rate as f64,
                minimum_secs: MIN_DURATION_SECS,
            });
        }

        let channels = self
            .channels
            .iter()
            .map(|channel| channel[start_frame..end_frame].to_vec())
            .collect();

        Ok(Self {
            channels,
            sample_rate: self.sample_rate,
            frame_count: length,
        })
    }

    /// Fail with `AudioTooShort` when the buffer is below the minimum duration
    pub fn ensure_min_duration(&self) -> Result<()> {
        let duration_secs = self.duration_secs();
        if duration_secs < MIN_DURATION_SECS {
            return Err(LoopError::AudioTooShort {
                duration_secs,
                minimum_secs: MIN_DURATION_SECS,
            });
        }
        Ok(())
    }

    /// Convert a time in seconds to a frame index, clamped to the buffer
    pub fn seconds_to_frame(&self, seconds: f64) -> usize {
        let frame = (sanitize(seconds) * self.sample_rate as f64).floor() as usize;
        frame.min(self.frame_count)
    }

    /// Get the number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Get the number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds, always derived from frame count and rate
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Get a read-only slice of a channel's samples
    ///
    /// # Panics
    /// Panics if `index` is out of range
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Iterate over all channels in order
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Mutable channel access for buffers under construction inside the crate
    pub(crate) fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }
}

// ============================================================================
// Tests
// ============================================================================
