//! Audio Engine Module
//!
//! Core of the looper:
//! - Sample buffers, selections and trimming
//! - The canonical 16-bit WAV codec and file I/O
//! - The playback transport and its clock/sink boundaries
//! - The editing session tying them together

pub mod buffer;
pub mod clock;
pub mod io;
pub mod session;
pub mod sink;
pub mod ticker;
pub mod transport;
pub mod wav;

pub use buffer::{SampleBuffer, Selection, MIN_DURATION_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use io::{loop_file_name, sha256_hex, to_data_url, write_wav, Decoder, WavFileDecoder};
pub use session::EditSession;
pub use sink::{AudioSink, NullSink, RecordingSink, SinkCommand};
pub use ticker::{SharedTransport, Ticker};
pub use transport::{PlaybackMode, Transport, TransportState};
