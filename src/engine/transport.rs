//! Transport State Machine for Seamloop
//!
//! Maps wall-clock time to a playback position inside a buffer. The same
//! transport previews both the trimmed clip (bounded by a selection range,
//! wrapping back to its start) and the generated loop (whole buffer,
//! wrapped natively by the sink).
//!
//! Position is never integrated tick by tick. Every command records an anchor
//! `(wall clock, position)` and each tick derives the position from the time
//! elapsed since that anchor, so tick jitter does not accumulate.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::engine::buffer::{SampleBuffer, Selection};
use crate::engine::clock::Clock;
use crate::engine::sink::AudioSink;

/// Range endpoints closer than this are treated as equal
const RANGE_EPSILON: f64 = 1e-9;

/// Playback mode of the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PlaybackMode {
    /// Nothing is sounding (default state)
    #[default]
    Stopped,
    /// The sink is producing audio
    Playing,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Stopped => write!(f, "Stopped"),
            PlaybackMode::Playing => write!(f, "Playing"),
        }
    }
}

/// Snapshot of everything the transport tracks
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TransportState {
    pub mode: PlaybackMode,
    /// Last computed playhead position in seconds
    pub position_secs: f64,
    /// Whole-buffer looping (loop preview) instead of a clip range
    pub loop_enabled: bool,
    pub range_start: f64,
    pub range_end: f64,
    /// Clock reading at the last (re)start of the sink
    pub anchor_wall_clock: f64,
    /// Position the sink was started at
    pub anchor_position: f64,
}

/// Playback state machine driving an [`AudioSink`]
///
/// All user-facing controls are forgiving: with nothing loaded they do
/// nothing, and out-of-range seeks are clamped.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use seamloop::engine::{ManualClock, NullSink, SampleBuffer, Transport};
///
/// let clock = ManualClock::new();
/// let mut transport = Transport::new(NullSink, clock.clone());
/// let buffer = Arc::new(SampleBuffer::allocate(1, 400, 100).unwrap());
/// transport.load_loop(buffer);
///
/// transport.play();
/// clock.advance(5.0);
/// assert!((transport.tick() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Transport<S: AudioSink, C: Clock> {
    sink: S,
    clock: C,
    buffer: Option<Arc<SampleBuffer>>,
    state: TransportState,
    /// A sink stream is running and must be stopped before the next start
    sink_active: bool,
}

impl<S: AudioSink, C: Clock> Transport<S, C> {
    /// Create an empty, stopped transport
    pub fn new(sink: S, clock: C) -> Self {
        Self {
            sink,
            clock,
            buffer: None,
            state: TransportState::default(),
            sink_active: false,
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Preview a clip bounded by `selection`
    ///
    /// Stops any running playback. The playhead keeps its position, clamped
    /// to the new buffer.
    pub fn load_clip(&mut self, buffer: Arc<SampleBuffer>, selection: Selection) {
        let range = selection.clamped_to(buffer.duration_secs());
        self.replace_buffer(buffer, false);
        self.state.range_start = range.start();
        self.state.range_end = range.end();
        debug!(
            "[TRANSPORT] Loaded clip, range {:.3}s..{:.3}s",
            range.start(),
            range.end()
        );
    }

    /// Preview a generated loop that wraps at the end of the buffer
    pub fn load_loop(&mut self, buffer: Arc<SampleBuffer>) {
        let duration = buffer.duration_secs();
        self.replace_buffer(buffer, true);
        self.state.range_start = 0.0;
        self.state.range_end = duration;
        debug!("[TRANSPORT] Loaded loop of {:.3}s", duration);
    }

    /// Drop the buffer and return to the empty state
    pub fn unload(&mut self) {
        self.stop_sink();
        self.buffer = None;
        self.state = TransportState::default();
        debug!("[TRANSPORT] Unloaded");
    }

    fn replace_buffer(&mut self, buffer: Arc<SampleBuffer>, loop_enabled: bool) {
        self.stop_sink();
        let position = self.state.position_secs.min(buffer.duration_secs());
        self.state = TransportState {
            position_secs: position,
            loop_enabled,
            ..TransportState::default()
        };
        self.buffer = Some(buffer);
    }

    /// Change the clip range; ignored in loop mode
    ///
    /// If the change switches between a partial and a full-buffer range while
    /// playing, the sink is restarted so its loop flag matches.
    pub fn set_range(&mut self, selection: Selection) {
        let Some(buffer) = self.buffer.clone() else {
            return;
        };
        if self.state.loop_enabled {
            return;
        }

        let was_native = self.native_loop();
        let position = self.tick();
        let range = selection.clamped_to(buffer.duration_secs());
        self.state.range_start = range.start();
        self.state.range_end = range.end();

        if self.is_playing() && was_native != self.native_loop() {
            self.restart_at(position);
        }
    }

    // ========================================================================
    // Transport Controls
    // ========================================================================

    /// Start playback from the current position
    ///
    /// State transition: Stopped -> Playing. A position outside the range
    /// snaps to the range start first.
    pub fn play(&mut self) {
        if self.buffer.is_none() {
            debug!("[TRANSPORT] Play ignored, nothing loaded");
            return;
        }
        if self.is_playing() {
            debug!("[TRANSPORT] Already playing");
            return;
        }

        let position = self.state.position_secs;
        if position < self.state.range_start || position > self.state.range_end {
            self.state.position_secs = self.state.range_start;
        }

        self.restart_at(self.state.position_secs);
        self.state.mode = PlaybackMode::Playing;
        debug!("[TRANSPORT] Play from {:.3}s", self.state.position_secs);
    }

    /// Stop playback, keeping the last computed position
    ///
    /// State transition: Playing -> Stopped
    pub fn pause(&mut self) {
        if !self.is_playing() {
            debug!("[TRANSPORT] Already stopped");
            return;
        }
        self.stop_sink();
        self.state.mode = PlaybackMode::Stopped;
        debug!("[TRANSPORT] Paused at {:.3}s", self.state.position_secs);
    }

    /// Move the playhead to `position` seconds
    ///
    /// The position is clamped to the buffer. While playing, the sink is
    /// stopped and restarted at the new position so it never drifts from the
    /// model.
    pub fn seek(&mut self, position: f64) {
        let Some(buffer) = self.buffer.as_ref() else {
            return;
        };
        if position.is_nan() {
            return;
        }

        let position = position.clamp(0.0, buffer.duration_secs());
        self.state.position_secs = position;
        if self.is_playing() {
            self.restart_at(position);
        }
        debug!("[TRANSPORT] Seek to {:.3}s", position);
    }

    /// Jump to the start of the range
    pub fn seek_to_range_start(&mut self) {
        self.seek(self.state.range_start);
    }

    /// Jump to the end of the range
    pub fn seek_to_range_end(&mut self) {
        self.seek(self.state.range_end);
    }

    /// Recompute the position from the clock
    ///
    /// Called periodically by the host scheduler. In clip mode, crossing the
    /// range end wraps to the range start plus the overshoot and restarts the
    /// sink there. In loop mode the position wraps modulo the buffer duration
    /// and the sink is left alone.
    ///
    /// Returns the new position.
    pub fn tick(&mut self) -> f64 {
        let Some(buffer) = self.buffer.as_ref() else {
            return self.state.position_secs;
        };
        if !self.is_playing() {
            return self.state.position_secs;
        }

        let duration = buffer.duration_secs();
        let now = self.clock.now();
        let elapsed = (now - self.state.anchor_wall_clock).max(0.0);
        let mut raw = self.state.anchor_position + elapsed;

        if self.native_loop() {
            if duration > 0.0 {
                raw = raw.rem_euclid(duration);
            }
        } else if raw >= self.state.range_end {
            let span = self.state.range_end - self.state.range_start;
            let overshoot = raw - self.state.range_end;
            raw = if span > RANGE_EPSILON {
                self.state.range_start + overshoot % span
            } else {
                self.state.range_start
            };
            debug!("[TRANSPORT] Wrapped to {:.3}s", raw);
            self.restart_at(raw);
        }

        self.state.position_secs = raw;
        raw
    }

    // ========================================================================
    // Sink management
    // ========================================================================

    /// Whether the sink wraps by itself: loop mode, or a clip range that
    /// spans the whole buffer
    fn native_loop(&self) -> bool {
        if self.state.loop_enabled {
            return true;
        }
        match &self.buffer {
            Some(buffer) => {
                self.state.range_start <= RANGE_EPSILON
                    && self.state.range_end >= buffer.duration_secs() - RANGE_EPSILON
            }
            None => false,
        }
    }

    /// Stop the running stream (if any), start a new one and re-anchor
    fn restart_at(&mut self, position: f64) {
        let Some(buffer) = self.buffer.clone() else {
            return;
        };
        let looping = self.native_loop();
        self.stop_sink();
        self.sink.start(buffer, position, looping);
        self.sink_active = true;
        self.state.anchor_wall_clock = self.clock.now();
        self.state.anchor_position = position;
    }

    fn stop_sink(&mut self) {
        if self.sink_active {
            self.sink.stop();
            self.sink_active = false;
        }
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// Check if transport is currently playing
    pub fn is_playing(&self) -> bool {
        self.state.mode == PlaybackMode::Playing
    }

    /// Get the last computed playhead position in seconds
    pub fn position(&self) -> f64 {
        self.state.position_secs
    }

    /// Get a copy of the full transport state
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Get the loaded buffer, if any
    pub fn buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.buffer.as_ref()
    }

    /// Duration of the loaded buffer, 0 when empty
    pub fn duration_secs(&self) -> f64 {
        self.buffer.as_ref().map_or(0.0, |b| b.duration_secs())
    }

    /// Current range as a selection
    pub fn range(&self) -> Selection {
        Selection::new(self.state.range_start, self.state.range_end)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::engine::sink::{RecordingSink, SinkCommand};
    use approx::assert_abs_diff_eq;

    type TestTransport = Transport<RecordingSink, ManualClock>;

    /// 10 second mono buffer at 100 Hz
    fn setup() -> (TestTransport, RecordingSink, ManualClock, Arc<SampleBuffer>) {
        let sink = RecordingSink::new();
        let clock = ManualClock::new();
        clock.set(100.0);
        let transport = Transport::new(sink.clone(), clock.clone());
        let buffer = Arc::new(SampleBuffer::allocate(1, 1000, 100).unwrap());
        (transport, sink, clock, buffer)
    }

    fn start_position(command: Option<SinkCommand>) -> (f64, bool) {
        match command {
            Some(SinkCommand::Start {
                position_secs,
                looping,
            }) => (position_secs, looping),
            other => panic!("Expected Start command, got: {:?}", other),
        }
    }

    // ------------------------------------------------------------------------
    // Basic State Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_default_state_is_stopped() {
        let (transport, _, _, _) = setup();
        assert!(!transport.is_playing());
        assert_eq!(transport.state(), TransportState::default());
        assert_eq!(transport.duration_secs(), 0.0);
    }

    #[test]
    fn test_controls_without_buffer_are_noops() {
        let (mut transport, sink, clock, _) = setup();
        transport.play();
        transport.seek(3.0);
        transport.set_range(Selection::new(1.0, 2.0));
        clock.advance(1.0);
        assert_eq!(transport.tick(), 0.0);
        transport.pause();

        assert!(!transport.is_playing());
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_playback_mode_display() {
        assert_eq!(format!("{}", PlaybackMode::Stopped), "Stopped");
        assert_eq!(format!("{}", PlaybackMode::Playing), "Playing");
    }

    // ------------------------------------------------------------------------
    // State Transition Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_play_starts_sink_and_anchors() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.seek(3.0);
        transport.play();

        assert!(transport.is_playing());
        let state = transport.state();
        assert_eq!(state.anchor_wall_clock, 100.0);
        assert_eq!(state.anchor_position, 3.0);
        assert_eq!(start_position(sink.last()), (3.0, false));
    }

    #[test]
    fn test_play_snaps_outside_position_to_range_start() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.seek(8.0);
        transport.play();

        assert_eq!(transport.position(), 2.0);
        assert_eq!(start_position(sink.last()), (2.0, false));
    }

    #[test]
    fn test_double_play_no_op() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.play();
        transport.play();
        assert_eq!(sink.commands().len(), 1);
    }

    #[test]
    fn test_pause_stops_sink_and_freezes_position() {
        let (mut transport, sink, clock, buffer) = setup();
        transport.load_loop(buffer);
        transport.play();
        clock.advance(1.5);
        transport.tick();
        transport.pause();

        assert!(!transport.is_playing());
        assert_eq!(sink.last(), Some(SinkCommand::Stop));

        clock.advance(3.0);
        assert_abs_diff_eq!(transport.tick(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_double_pause_no_op() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.pause();
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_resume_after_pause_continues() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_loop(buffer);
        transport.play();
        clock.advance(2.0);
        transport.tick();
        transport.pause();
        clock.advance(10.0);
        transport.play();
        clock.advance(0.5);
        assert_abs_diff_eq!(transport.tick(), 2.5, epsilon = 1e-9);
    }

    // ------------------------------------------------------------------------
    // Seek Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_seek_while_stopped_has_no_sink_effect() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.seek(4.0);
        assert_eq!(transport.position(), 4.0);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_seek_clamps_to_buffer() {
        let (mut transport, _, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.seek(25.0);
        assert_eq!(transport.position(), 10.0);
        transport.seek(-1.0);
        assert_eq!(transport.position(), 0.0);
        transport.seek(f64::NAN);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_seek_while_playing_restarts_sink() {
        let (mut transport, sink, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.play();
        clock.advance(0.5);
        transport.seek(4.0);

        assert_eq!(
            sink.commands(),
            vec![
                SinkCommand::Start {
                    position_secs: 2.0,
                    looping: false
                },
                SinkCommand::Stop,
                SinkCommand::Start {
                    position_secs: 4.0,
                    looping: false
                },
            ]
        );
        assert_eq!(transport.state().anchor_wall_clock, 100.5);
        assert_eq!(transport.state().anchor_position, 4.0);

        clock.advance(1.0);
        assert_abs_diff_eq!(transport.tick(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_seek_to_range_edges() {
        let (mut transport, _, _, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.seek_to_range_end();
        assert_eq!(transport.position(), 6.0);
        transport.seek_to_range_start();
        assert_eq!(transport.position(), 2.0);
    }

    // ------------------------------------------------------------------------
    // Clip Mode Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_clip_tick_advances_linearly() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.play();
        clock.advance(1.25);
        assert_abs_diff_eq!(transport.tick(), 3.25, epsilon = 1e-9);
        clock.advance(1.25);
        assert_abs_diff_eq!(transport.tick(), 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_clip_wraps_with_overshoot() {
        let (mut transport, sink, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.seek(5.9);
        transport.play();

        clock.advance(0.3);
        let position = transport.tick();
        assert_abs_diff_eq!(position, 2.2, epsilon = 1e-9);

        let (restart, looping) = start_position(sink.last());
        assert_abs_diff_eq!(restart, 2.2, epsilon = 1e-9);
        assert!(!looping);
        assert_eq!(transport.state().anchor_wall_clock, clock.now());

        // Re-anchored: later ticks measure from the wrap
        clock.advance(0.5);
        assert_abs_diff_eq!(transport.tick(), 2.7, epsilon = 1e-9);
        assert_eq!(sink.start_count(), 2);
    }

    #[test]
    fn test_clip_never_exceeds_range_end() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.play();
        for _ in 0..200 {
            clock.advance(0.05);
            let position = transport.tick();
            assert!((2.0..6.0).contains(&position), "position {}", position);
        }
    }

    #[test]
    fn test_clip_late_tick_wraps_within_range() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(2.0, 6.0));
        transport.seek(5.0);
        transport.play();
        clock.advance(9.5);
        // raw 14.5, overshoot 8.5, 8.5 mod 4 = 0.5
        assert_abs_diff_eq!(transport.tick(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_clip_reversed_endpoints_play_inside_range() {
        let (mut transport, sink, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(6.0, 2.0));
        let state = transport.state();
        assert!(state.range_start <= state.range_end);
        assert_eq!((state.range_start, state.range_end), (2.0, 6.0));

        transport.seek(6.0);
        transport.play();
        for _ in 0..5 {
            clock.advance(0.05);
            let position = transport.tick();
            assert!((2.0..=6.0).contains(&position), "position {}", position);
        }
        // One start from play, one from the single wrap at the range end
        assert_eq!(sink.start_count(), 2);
    }

    #[test]
    fn test_clip_zero_width_range_pins_to_start() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_clip(buffer, Selection::new(3.0, 3.0));
        transport.play();
        clock.advance(1.0);
        assert_eq!(transport.tick(), 3.0);
    }

    #[test]
    fn test_full_range_clip_loops_natively() {
        let (mut transport, sink, clock, buffer) = setup();
        let full = Selection::full(&buffer);
        transport.load_clip(buffer, full);
        transport.seek(9.5);
        transport.play();
        assert_eq!(start_position(sink.last()), (9.5, true));

        clock.advance(1.0);
        assert_abs_diff_eq!(transport.tick(), 0.5, epsilon = 1e-9);
        assert_eq!(sink.start_count(), 1);
    }

    #[test]
    fn test_set_range_switching_loop_flag_restarts() {
        let (mut transport, sink, clock, buffer) = setup();
        let full = Selection::full(&buffer);
        transport.load_clip(buffer, full);
        transport.play();
        clock.advance(1.0);

        transport.set_range(Selection::new(0.5, 4.0));
        let (position, looping) = start_position(sink.last());
        assert_abs_diff_eq!(position, 1.0, epsilon = 1e-9);
        assert!(!looping);
    }

    #[test]
    fn test_set_range_ignored_in_loop_mode() {
        let (mut transport, _, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.set_range(Selection::new(1.0, 2.0));
        assert_eq!(transport.range(), Selection::new(0.0, 10.0));
    }

    // ------------------------------------------------------------------------
    // Loop Mode Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_loop_period_equals_duration() {
        let (mut transport, sink, clock, buffer) = setup();
        transport.load_loop(buffer);
        transport.seek(3.0);
        transport.play();
        clock.advance(10.0);
        assert_abs_diff_eq!(transport.tick(), 3.0, epsilon = 1e-9);
        assert_eq!(sink.start_count(), 1);
        assert_eq!(start_position(sink.last()), (3.0, true));
    }

    #[test]
    fn test_loop_wraps_modulo_duration() {
        let (mut transport, _, clock, buffer) = setup();
        transport.load_loop(buffer);
        transport.play();
        clock.advance(25.5);
        assert_abs_diff_eq!(transport.tick(), 5.5, epsilon = 1e-9);
    }

    // ------------------------------------------------------------------------
    // Loading Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_loading_stops_previous_stream() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_loop(buffer.clone());
        transport.play();
        transport.load_clip(buffer, Selection::new(1.0, 2.0));

        assert!(!transport.is_playing());
        assert_eq!(sink.last(), Some(SinkCommand::Stop));
    }

    #[test]
    fn test_loading_clamps_playhead_to_new_buffer() {
        let (mut transport, _, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.seek(8.0);
        let short = Arc::new(SampleBuffer::allocate(1, 300, 100).unwrap());
        transport.load_clip(short, Selection::new(0.0, 3.0));
        assert_eq!(transport.position(), 3.0);
    }

    #[test]
    fn test_unload_resets() {
        let (mut transport, sink, _, buffer) = setup();
        transport.load_loop(buffer);
        transport.play();
        transport.unload();
        assert!(transport.buffer().is_none());
        assert_eq!(transport.state(), TransportState::default());
        assert_eq!(sink.last(), Some(SinkCommand::Stop));
    }
}
