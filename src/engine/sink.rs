//! Audio output boundary
//!
//! The transport never produces sound itself. It issues `start`/`stop`
//! commands to an [`AudioSink`] provided by the host.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::engine::buffer::SampleBuffer;

/// Playback device driven by the transport
pub trait AudioSink {
    /// Begin audible output of `buffer` at `position_secs`
    ///
    /// When `looping` is true the sink wraps to position 0 at the end of the
    /// buffer on its own.
    fn start(&mut self, buffer: Arc<SampleBuffer>, position_secs: f64, looping: bool);

    /// Silence the current stream
    fn stop(&mut self);
}

/// Sink that only logs; used by the CLI preview where no device is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn start(&mut self, buffer: Arc<SampleBuffer>, position_secs: f64, looping: bool) {
        debug!(
            "[SINK] start at {:.3}s of {:.3}s (loop: {})",
            position_secs,
            buffer.duration_secs(),
            looping
        );
    }

    fn stop(&mut self) {
        debug!("[SINK] stop");
    }
}

/// A command observed by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCommand {
    Start { position_secs: f64, looping: bool },
    Stop,
}

/// Sink that records every command it receives
///
/// Clones share the same log, so the host can inspect what the transport did.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<SinkCommand>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all commands received so far
    pub fn commands(&self) -> Vec<SinkCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent command
    pub fn last(&self) -> Option<SinkCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of `start` commands received
    pub fn start_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, SinkCommand::Start { .. }))
            .count()
    }

    fn push(&self, command: SinkCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl AudioSink for RecordingSink {
    fn start(&mut self, _buffer: Arc<SampleBuffer>, position_secs: f64, looping: bool) {
        self.push(SinkCommand::Start {
            position_secs,
            looping,
        });
    }

    fn stop(&mut self) {
        self.push(SinkCommand::Stop);
    }
}
