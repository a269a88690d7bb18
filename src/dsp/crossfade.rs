//! Loop crossfade builder.
//!
//! Turns a linear clip into a buffer that can repeat back-to-back without a
//! click at the wrap point. The head of the clip is faded in over its tail,
//! and the blended region becomes the last frames of the loop, so playback
//! that wraps from the end to frame 0 continues exactly where the head left off.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::buffer::SampleBuffer;
use crate::error::{LoopError, Result};

/// Gain curve used across the seam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossfadeCurve {
    /// `fade_in = t`, `fade_out = 1 - t`
    Linear,
    /// `fade_in = sqrt(t)`, `fade_out = sqrt(1 - t)`; keeps perceived loudness
    /// constant where a linear blend dips at the midpoint
    #[default]
    EqualPower,
}

impl CrossfadeCurve {
    /// Gains `(fade_in, fade_out)` at normalized position `t` in `[0, 1]`
    #[inline]
    pub fn gains(self, t: f32) -> (f32, f32) {
        match self {
            CrossfadeCurve::Linear => (t, 1.0 - t),
            CrossfadeCurve::EqualPower => (t.sqrt(), (1.0 - t).sqrt()),
        }
    }
}

impl fmt::Display for CrossfadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossfadeCurve::Linear => write!(f, "linear"),
            CrossfadeCurve::EqualPower => write!(f, "equal-power"),
        }
    }
}

impl FromStr for CrossfadeCurve {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(CrossfadeCurve::Linear),
            "equal-power" | "equalpower" | "equal_power" => Ok(CrossfadeCurve::EqualPower),
            other => Err(LoopError::Config {
                reason: format!("unknown crossfade curve '{}'", other),
            }),
        }
    }
}

/// Crossfade duration and curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeSpec {
    pub duration_secs: f64,
    pub curve: CrossfadeCurve,
}

impl CrossfadeSpec {
    pub fn new(duration_secs: f64, curve: CrossfadeCurve) -> Self {
        Self {
            duration_secs,
            curve,
        }
    }

    /// Number of frames the seam spans at `sample_rate`
    pub fn frames(&self, sample_rate: u32) -> usize {
        (self.duration_secs * sample_rate as f64).floor() as usize
    }

    fn validate(&self) -> Result<()> {
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(LoopError::InvalidCrossfade {
                duration_secs: self.duration_secs,
            });
        }
        Ok(())
    }
}

/// Builds seamless loops from trimmed clips
///
/// # Example
/// ```
/// use seamloop::dsp::{CrossfadeCurve, CrossfadeSpec, LoopCrossfadeBuilder};
/// use seamloop::engine::SampleBuffer;
///
/// let clip = SampleBuffer::allocate(1, 44100, 44100).unwrap();
/// let spec = CrossfadeSpec::new(0.25, CrossfadeCurve::EqualPower);
/// let looped = LoopCrossfadeBuilder::build(&clip, &spec).unwrap();
/// assert_eq!(looped.frame_count(), 44100 - 11025);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopCrossfadeBuilder;

impl LoopCrossfadeBuilder {
    /// Produce a loop buffer `crossfade_frames` shorter than the input
    ///
    /// Output layout per channel:
    /// - `[0, out - cf)`: input frames `[cf, out)` copied verbatim
    /// - `[out - cf, out)`: input head `[0, cf)` fading in over the input tail
    ///   `[len - cf, len)` fading out
    ///
    /// No clamping is applied; samples may leave `[-1, 1]` until export.
    ///
    /// # Errors
    /// * `InvalidCrossfade` - if the duration is negative or not finite
    /// * `CrossfadeTooLong` - if the seam would not fit twice into the input
    pub fn build(buffer: &SampleBuffer, spec: &CrossfadeSpec) -> Result<SampleBuffer> {
        spec.validate()?;

        let input_frames = buffer.frame_count();
        let crossfade_frames = spec.frames(buffer.sample_rate());

        if crossfade_frames >= input_frames || crossfade_frames * 2 > input_frames {
            return Err(LoopError::CrossfadeTooLong {
                crossfade_secs: spec.duration_secs,
                limit_secs: buffer.duration_secs() / 2.0,
                buffer_secs: buffer.duration_secs(),
            });
        }

        let output_frames = input_frames - crossfade_frames;
        let body_frames = output_frames - crossfade_frames;
        let tail_start = input_frames - crossfade_frames;

        let mut output =
            SampleBuffer::allocate(buffer.channel_count(), output_frames, buffer.sample_rate())?;

        for ch in 0..buffer.channel_count() {
            let input = buffer.channel(ch);
            let out = output.channel_mut(ch);

            out[..body_frames].copy_from_slice(&input[crossfade_frames..output_frames]);

            let head = &input[..crossfade_frames];
            let tail = &input[tail_start..];
            for (i, (seam, (&h, &t))) in out[body_frames..]
                .iter_mut()
                .zip(head.iter().zip(tail))
                .enumerate()
            {
                let (fade_in, fade_out) = spec.curve.gains(i as f32 / crossfade_frames as f32);
                *seam = h * fade_in + t * fade_out;
            }
        }

        debug!(
            "[CROSSFADE] {} -> {} frames ({} seam frames, {})",
            input_frames, output_frames, crossfade_frames, spec.curve
        );

        Ok(output)
    }
}

// ============================================================================
// Tests
// ============================================================================
