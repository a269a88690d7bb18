//! Seamloop - Seamless Audio Loop Builder
//!
//! Turns a section of a recording into a loop that repeats without a click:
//! 1. Decode audio and select the part to keep
//! 2. Crop it, then blend the head over the tail with a crossfade
//! 3. Preview the clip or the loop through a transport, export as 16-bit WAV
//!
//! # Architecture
//!
//! - `engine`: buffers, WAV codec, file I/O, transport, editing session
//! - `dsp`: loop crossfade builder and waveform envelope reducer
//! - `config`: tool-wide defaults loaded from JSON
//! - `cli`: the `seamloop-cli` command-line front end

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use error::{LoopError, Result};
