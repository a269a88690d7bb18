//! Editing session
//!
//! Owns the audio being edited: the originally decoded buffer, the working
//! copy that crops apply to, the current selection and the most recently
//! generated loop. Buffers are shared through `Arc` so the transport can play
//! them without copying.

use std::sync::Arc;

use log::{debug, info};

use crate::dsp::crossfade::{CrossfadeSpec, LoopCrossfadeBuilder};
use crate::dsp::waveform::{reduce_channel, EnvelopeColumn};
use crate::engine::buffer::{SampleBuffer, Selection};
use crate::engine::wav;
use crate::error::{LoopError, Result};

/// Clip being turned into a loop
#[derive(Debug, Clone)]
pub struct EditSession {
    original: Arc<SampleBuffer>,
    working: Arc<SampleBuffer>,
    loop_buffer: Option<Arc<SampleBuffer>>,
    selection: Selection,
    crossfade: CrossfadeSpec,
}

impl EditSession {
    /// Start a session on freshly decoded audio
    ///
    /// # Errors
    /// * `AudioTooShort` - if the audio is shorter than 0.2 seconds
    pub fn open(decoded: SampleBuffer, crossfade: CrossfadeSpec) -> Result<Self> {
        decoded.ensure_min_duration()?;

        let working = Arc::new(SampleBuffer::copy_of(&decoded));
        let selection = Selection::full(&working);
        info!(
            "[SESSION] Opened {:.3}s, {} channels at {} Hz",
            working.duration_secs(),
            working.channel_count(),
            working.sample_rate()
        );

        Ok(Self {
            original: Arc::new(decoded),
            working,
            loop_buffer: None,
            selection,
            crossfade,
        })
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Move the selection start, never past the current end
    pub fn set_selection_start(&mut self, seconds: f64) {
        let start = self.clamp_to_working(seconds).min(self.selection.end());
        self.selection = Selection::new(start, self.selection.end());
    }

    /// Move the selection end, never before the current start
    pub fn set_selection_end(&mut self, seconds: f64) {
        let end = self.clamp_to_working(seconds).max(self.selection.start());
        self.selection = Selection::new(self.selection.start(), end);
    }

    fn clamp_to_working(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.working.duration_secs())
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Replace the working buffer with the selected range
    ///
    /// The selection then covers the whole new buffer and any generated loop
    /// is discarded. On error nothing changes.
    pub fn crop(&mut self) -> Result<()> {
        let trimmed = self.working.trim(self.selection)?;
        info!(
            "[SESSION] Cropped to {:.3}s..{:.3}s ({} frames)",
            self.selection.start(),
            self.selection.end(),
            trimmed.frame_count()
        );

        self.working = Arc::new(trimmed);
        self.selection = Selection::full(&self.working);
        self.loop_buffer = None;
        Ok(())
    }

    /// Throw away all edits and return to the decoded audio
    pub fn reset(&mut self) {
        self.working = Arc::new(SampleBuffer::copy_of(&self.original));
        self.selection = Selection::full(&self.working);
        self.loop_buffer = None;
        info!("[SESSION] Reset to original audio");
    }

    /// Change the crossfade used for loops built from now on
    pub fn set_crossfade(&mut self, crossfade: CrossfadeSpec) {
        if crossfade != self.crossfade {
            self.crossfade = crossfade;
            self.loop_buffer = None;
        }
    }

    /// Build a loop from the whole working buffer
    ///
    /// # Errors
    /// * `CrossfadeTooLong` - if the crossfade exceeds half the working duration
    /// * `InvalidCrossfade` - if the crossfade is negative or not finite
    pub fn build_loop(&mut self, crossfade: CrossfadeSpec) -> Result<Arc<SampleBuffer>> {
        let limit_secs = self.working.duration_secs() / 2.0;
        if crossfade.duration_secs > limit_secs {
            return Err(LoopError::CrossfadeTooLong {
                crossfade_secs: crossfade.duration_secs,
                limit_secs,
                buffer_secs: self.working.duration_secs(),
            });
        }

        let looped = Arc::new(LoopCrossfadeBuilder::build(&self.working, &crossfade)?);
        debug!(
            "[SESSION] Built {:.3}s loop with {:.3}s {} crossfade",
            looped.duration_secs(),
            crossfade.duration_secs,
            crossfade.curve
        );

        self.crossfade = crossfade;
        self.loop_buffer = Some(Arc::clone(&looped));
        Ok(looped)
    }

    /// WAV bytes of the loop, building it with the current crossfade if needed
    pub fn export_loop(&mut self) -> Result<Vec<u8>> {
        let looped = match &self.loop_buffer {
            Some(existing) => Arc::clone(existing),
            None => self.build_loop(self.crossfade)?,
        };
        wav::encode(&looped)
    }

    /// Where the seam preview starts: `lead_secs` before the crossfade region
    ///
    /// Returns `None` when no loop has been built.
    pub fn loop_preview_start(&self, lead_secs: f64) -> Option<f64> {
        self.loop_buffer.as_ref().map(|looped| {
            (looped.duration_secs() - self.crossfade.duration_secs - lead_secs).max(0.0)
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn original(&self) -> &Arc<SampleBuffer> {
        &self.original
    }

    pub fn working(&self) -> &Arc<SampleBuffer> {
        &self.working
    }

    pub fn loop_buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.loop_buffer.as_ref()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn crossfade(&self) -> CrossfadeSpec {
        self.crossfade
    }

    /// Envelope of the working buffer's first channel
    pub fn working_envelope(&self, columns: usize) -> Result<Vec<EnvelopeColumn>> {
        reduce_channel(&self.working, 0, columns)
    }

    /// Envelope of the loop's first channel, if built
    pub fn loop_envelope(&self, columns: usize) -> Option<Result<Vec<EnvelopeColumn>>> {
        self.loop_buffer
            .as_ref()
            .map(|looped| reduce_channel(looped, 0, columns))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
