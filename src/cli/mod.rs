//! CLI Module
//!
//! Command-line interface for the Seamloop loop builder.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::CrossfadeCurve;

/// Seamloop - turn a section of a recording into a seamless loop
#[derive(Parser, Debug)]
#[command(name = "seamloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show format and duration of an audio file
    #[command(name = "info")]
    Info {
        /// Input WAV file
        input: PathBuf,
    },

    /// Crop a section and export it as a seamless loop
    #[command(name = "loop")]
    Loop {
        /// Input WAV file
        input: PathBuf,

        /// Selection start in seconds
        #[arg(short, long)]
        start: Option<f64>,

        /// Selection end in seconds
        #[arg(short, long)]
        end: Option<f64>,

        /// Crossfade length in seconds
        #[arg(short = 'x', long)]
        crossfade: Option<f64>,

        /// Crossfade curve (linear, equal-power)
        #[arg(long)]
        curve: Option<CrossfadeCurve>,

        /// Output path (default: <input stem>_loop.wav next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print the loop as a data URL
        #[arg(long)]
        data_url: bool,
    },

    /// Print the waveform envelope as JSON
    #[command(name = "waveform")]
    Waveform {
        /// Input WAV file
        input: PathBuf,

        /// Number of envelope columns
        #[arg(short = 'n', long)]
        columns: Option<usize>,

        /// Channel to reduce
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },

    /// Run the transport against a silent sink and report the playhead
    #[command(name = "preview")]
    Preview {
        /// Input WAV file
        input: PathBuf,

        /// Selection start in seconds
        #[arg(short, long)]
        start: Option<f64>,

        /// Selection end in seconds
        #[arg(short, long)]
        end: Option<f64>,

        /// How long to run, in seconds
        #[arg(long, default_value_t = 3.0)]
        seconds: f64,

        /// Preview the generated loop from just before its seam
        #[arg(long = "loop")]
        looped: bool,
    },
}
