//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use anyhow::Context;
use cantor_config::{SynthConfig, find_config};
use cantor_core::note_name_to_freq;

/// Load the configuration named on the command line, or the user one.
///
/// Falls back to defaults when no file is given and none exists.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<SynthConfig> {
    match find_config(explicit) {
        Some(path) => {
            let config = SynthConfig::load(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("checking configuration {}", path.display()))?;
            Ok(config)
        }
        None => Ok(SynthConfig::default()),
    }
}

/// Parse a note name (`C4`, `F#3`, `Bb2`) or a frequency in Hz.
pub fn parse_frequency(note: &str) -> anyhow::Result<f32> {
    if let Ok(hz) = note.parse::<f32>() {
        anyhow::ensure!(
            hz.is_finite() && hz > 0.0,
            "frequency must be positive, got {hz}"
        );
        return Ok(hz);
    }
    note_name_to_freq(note)
        .with_context(|| format!("'{note}' is neither a note name (e.g. C4, F#3) nor a frequency"))
}
