//! Looper configuration
//!
//! Defaults for everything the tool would otherwise hard-code. Read from a
//! JSON file; missing fields fall back to their defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::crossfade::{CrossfadeCurve, CrossfadeSpec};
use crate::error::{LoopError, Result};

/// Default crossfade length in seconds.
pub const DEFAULT_CROSSFADE_SECS: f64 = 1.0;
/// Default number of envelope columns.
pub const DEFAULT_WAVEFORM_COLUMNS: usize = 800;
/// Default transport tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
/// Default time heard before the crossfade region when previewing the seam.
pub const DEFAULT_PREVIEW_LEAD_SECS: f64 = 5.0;
/// Default suffix appended to exported file names.
pub const DEFAULT_EXPORT_SUFFIX: &str = "_loop";

/// Tool-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    /// Crossfade used when none is given explicitly.
    pub crossfade_secs: f64,

    /// Crossfade gain curve.
    pub crossfade_curve: CrossfadeCurve,

    /// Envelope resolution for waveform output.
    pub waveform_columns: usize,

    /// Transport tick period.
    pub tick_interval_ms: u64,

    /// Lead-in before the crossfade for the seam preview.
    pub preview_lead_secs: f64,

    /// Appended to the input file stem when exporting.
    pub export_suffix: String,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            crossfade_curve: CrossfadeCurve::default(),
            waveform_columns: DEFAULT_WAVEFORM_COLUMNS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            preview_lead_secs: DEFAULT_PREVIEW_LEAD_SECS,
            export_suffix: DEFAULT_EXPORT_SUFFIX.to_string(),
        }
    }
}

impl LooperConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("[CONFIG] Loading {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate JSON config text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty JSON, suitable for writing a starter config.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no operation could use.
    pub fn validate(&self) -> Result<()> {
        if !self.crossfade_secs.is_finite() || self.crossfade_secs < 0.0 {
            return Err(config_error(format!(
                "crossfade_secs must be a non-negative number, got {}",
                self.crossfade_secs
            )));
        }
        if self.waveform_columns == 0 {
            return Err(config_error("waveform_columns must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(config_error("tick_interval_ms must be at least 1"));
        }
        if !self.preview_lead_secs.is_finite() || self.preview_lead_secs < 0.0 {
            return Err(config_error(format!(
                "preview_lead_secs must be a non-negative number, got {}",
                self.preview_lead_secs
            )));
        }
        if self.export_suffix.contains(['/', '\\']) {
            return Err(config_error(format!(
                "export_suffix '{}' must not contain path separators",
                self.export_suffix
            )));
        }
        Ok(())
    }

    pub fn crossfade_spec(&self) -> CrossfadeSpec {
        CrossfadeSpec::new(self.crossfade_secs, self.crossfade_curve)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn config_error(reason: impl Into<String>) -> LoopError {
    LoopError::Config {
        reason: reason.into(),
    }
}
