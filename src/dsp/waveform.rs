//! Waveform envelope reduction.
//!
//! Decimates a channel into a fixed number of `(min, max)` columns for a
//! drawing surface. Each column covers `ceil(len / columns)` samples; reads
//! past the end of the channel count as silence.

use crate::engine::buffer::{SampleBuffer, Selection};
use crate::error::{LoopError, Result};

/// One envelope column: `(min, max)` amplitude
pub type EnvelopeColumn = (f32, f32);

/// Reduce `samples` to exactly `columns` `(min, max)` pairs
///
/// # Example
/// ```
/// use seamloop::dsp::reduce;
///
/// let envelope = reduce(&[0.5, -0.25, 1.0], 2);
/// assert_eq!(envelope, vec![(-0.25, 0.5), (0.0, 1.0)]);
/// ```
pub fn reduce(samples: &[f32], columns: usize) -> Vec<EnvelopeColumn> {
    if columns == 0 {
        return Vec::new();
    }

    let window = samples.len().div_ceil(columns);
    if window == 0 {
        return vec![(0.0, 0.0); columns];
    }

    (0..columns)
        .map(|col| {
            let start = (col * window).min(samples.len());
            let end = (start + window).min(samples.len());
            let in_range = &samples[start..end];

            // Padding past the end reads as 0
            let (mut min, mut max) = if in_range.len() < window {
                (0.0_f32, 0.0_f32)
            } else {
                (f32::INFINITY, f32::NEG_INFINITY)
            };

            for &sample in in_range {
                min = min.min(sample);
                max = max.max(sample);
            }

            if min > max {
                (0.0, 0.0)
            } else {
                (min, max)
            }
        })
        .collect()
}

/// Reduce one channel of a buffer
///
/// # Errors
/// * `InvalidDimensions` - if `channel` does not exist in the buffer
pub fn reduce_channel(
    buffer: &SampleBuffer,
    channel: usize,
    columns: usize,
) -> Result<Vec<EnvelopeColumn>> {
    if channel >= buffer.channel_count() {
        return Err(LoopError::dimensions(
            "reduce_channel",
            format!(
                "channel {} requested from a {}-channel buffer",
                channel,
                buffer.channel_count()
            ),
        ));
    }
    Ok(reduce(buffer.channel(channel), columns))
}

/// Column under the playhead for an envelope of `columns` columns
///
/// Returns `None` for an empty buffer or a zero-width envelope.
pub fn playhead_column(position_secs: f64, duration_secs: f64, columns: usize) -> Option<usize> {
    if columns == 0 || duration_secs <= 0.0 {
        return None;
    }
    let ratio = (position_secs / duration_secs).clamp(0.0, 1.0);
    Some(((ratio * columns as f64) as usize).min(columns - 1))
}

/// Column span `[start, end)` highlighted for a selection
pub fn selection_columns(
    selection: Selection,
    duration_secs: f64,
    columns: usize,
) -> Option<(usize, usize)> {
    if columns == 0 || duration_secs <= 0.0 || selection.is_empty() {
        return None;
    }
    let to_column = |seconds: f64| {
        let ratio = (seconds / duration_secs).clamp(0.0, 1.0);
        (ratio * columns as f64).round() as usize
    };
    Some((to_column(selection.start()), to_column(selection.end())))
}
