//! Signal processing
//!
//! Pure, synchronous transforms over sample buffers: the loop crossfade and
//! the waveform envelope reducer.

pub mod crossfade;
pub mod waveform;

pub use crossfade::{CrossfadeCurve, CrossfadeSpec, LoopCrossfadeBuilder};
pub use waveform::{playhead_column, reduce, reduce_channel, selection_columns, EnvelopeColumn};
