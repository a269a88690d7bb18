//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::config::LooperConfig;
use crate::dsp::{playhead_column, reduce_channel, selection_columns, CrossfadeCurve, CrossfadeSpec};
use crate::engine::{
    loop_file_name, to_data_url, write_wav, AudioSink, Clock, EditSession, NullSink, SampleBuffer,
    SharedTransport, SystemClock, Ticker, Transport, WavFileDecoder,
};

/// Load the config file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<LooperConfig> {
    match path {
        Some(path) => LooperConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(LooperConfig::default()),
    }
}

fn decode_input(input: &Path) -> Result<SampleBuffer> {
    WavFileDecoder::new()
        .decode_file(input)
        .with_context(|| format!("Failed to decode {}", input.display()))
}

/// Open a session and crop it to the optional selection.
fn open_session(
    input: &Path,
    start: Option<f64>,
    end: Option<f64>,
    crossfade: CrossfadeSpec,
) -> Result<EditSession> {
    let mut session = EditSession::open(decode_input(input)?, crossfade)?;
    if start.is_none() && end.is_none() {
        return Ok(session);
    }

    if let Some(end) = end {
        session.set_selection_end(end);
    }
    if let Some(start) = start {
        session.set_selection_start(start);
    }

    let selection = session.selection();
    session.crop().with_context(|| {
        format!(
            "Cannot crop to {:.3}s..{:.3}s",
            selection.start(),
            selection.end()
        )
    })?;
    Ok(session)
}

/// Print format and duration of an audio file.
pub fn info(input: &Path) -> Result<()> {
    info!("Inspecting: {}", input.display());
    let buffer = decode_input(input)?;

    println!("File:        {}", input.display());
    println!("Duration:    {:.3}s", buffer.duration_secs());
    println!("Channels:    {}", buffer.channel_count());
    println!("Sample rate: {} Hz", buffer.sample_rate());
    println!("Frames:      {}", buffer.frame_count());
    println!("Peak:        {:.4}", buffer.peak());

    Ok(())
}

/// Crop, build the loop and export it.
#[allow(clippy::too_many_arguments)]
pub fn make_loop(
    config: &LooperConfig,
    input: &Path,
    start: Option<f64>,
    end: Option<f64>,
    crossfade: Option<f64>,
    curve: Option<CrossfadeCurve>,
    output: Option<PathBuf>,
    data_url: bool,
) -> Result<()> {
    let spec = CrossfadeSpec::new(
        crossfade.unwrap_or(config.crossfade_secs),
        curve.unwrap_or(config.crossfade_curve),
    );
    let mut session = open_session(input, start, end, spec)?;
    session.build_loop(spec).context("Cannot build loop")?;
    let bytes = session.export_loop()?;

    let output = output.unwrap_or_else(|| {
        input.with_file_name(loop_file_name(input, &config.export_suffix))
    });
    let checksum = write_wav(&output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let looped = session
        .loop_buffer()
        .context("Loop missing after export")?;
    println!("Loop written: {}", output.display());
    println!(
        "Length: {:.3}s ({} frames), crossfade {:.3}s {}",
        looped.duration_secs(),
        looped.frame_count(),
        spec.duration_secs,
        spec.curve
    );
    println!("SHA-256: {}", checksum);

    if data_url {
        println!("{}", to_data_url(&bytes));
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct WaveformReport {
    sample_rate: u32,
    duration_secs: f64,
    channel: usize,
    columns: Vec<(f32, f32)>,
}

/// Print the min/max envelope of one channel as JSON.
pub fn waveform(
    config: &LooperConfig,
    input: &Path,
    columns: Option<usize>,
    channel: usize,
) -> Result<()> {
    let buffer = decode_input(input)?;
    let columns = columns.unwrap_or(config.waveform_columns);
    if columns == 0 {
        bail!("Column count must be at least 1");
    }

    let report = WaveformReport {
        sample_rate: buffer.sample_rate(),
        duration_secs: buffer.duration_secs(),
        channel,
        columns: reduce_channel(&buffer, channel, columns)?,
    };
    println!("{}", serde_json::to_string(&report)?);

    Ok(())
}

/// Load the cropped clip, or the loop built from it, into `transport`.
fn load_preview<S: AudioSink, C: Clock>(
    config: &LooperConfig,
    session: &mut EditSession,
    transport: &mut Transport<S, C>,
    looped: bool,
) -> Result<()> {
    if looped {
        let buffer = session
            .build_loop(config.crossfade_spec())
            .context("Cannot build loop")?;
        let from = session
            .loop_preview_start(config.preview_lead_secs)
            .unwrap_or(0.0);
        transport.load_loop(Arc::clone(&buffer));
        transport.seek(from);
        println!(
            "Previewing {:.3}s loop from {:.3}s (seam at {:.3}s)",
            buffer.duration_secs(),
            from,
            buffer.duration_secs()
        );
    } else {
        let selection = session.selection();
        let duration = session.working().duration_secs();
        transport.load_clip(Arc::clone(session.working()), selection);
        transport.seek_to_range_start();
        println!(
            "Previewing clip {:.3}s..{:.3}s (columns {:?})",
            selection.start(),
            selection.end(),
            selection_columns(selection, duration, config.waveform_columns)
        );
    }
    Ok(())
}

/// Drive the transport in real time against a silent sink.
pub fn preview(
    config: &LooperConfig,
    input: &Path,
    start: Option<f64>,
    end: Option<f64>,
    seconds: f64,
    looped: bool,
) -> Result<()> {
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("Preview length must be a non-negative number of seconds");
    }

    let mut session = open_session(input, start, end, config.crossfade_spec())?;
    let mut transport = Transport::new(NullSink, SystemClock::new());
    load_preview(config, &mut session, &mut transport, looped)?;
    let columns = config.waveform_columns;

    let duration = transport.duration_secs();
    let shared = SharedTransport::new(transport);
    shared.with(|t| t.play());

    let mut ticker = Ticker::spawn(shared.clone(), config.tick_interval(), move |position| {
        let column = playhead_column(position, duration, columns);
        debug!("[PREVIEW] {:.3}s (column {:?})", position, column);
    });
    thread::sleep(Duration::from_secs_f64(seconds));
    ticker.stop();

    let state = shared.with(|t| {
        t.tick();
        t.pause();
        t.state()
    });
    println!("{}", serde_json::to_string_pretty(&state)?);

    Ok(())
}
