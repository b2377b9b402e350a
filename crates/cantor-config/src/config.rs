//! The `cantor` configuration file.

use std::path::Path;

use cantor_synth::{InstrumentPreset, PresetTable, Synth, SynthOptions};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_config;

/// Output device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self { sample_rate: 48000 }
    }
}

/// Synthesizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthSection {
    /// Master volume in `[0, 1]`.
    pub master_volume: f32,
    /// Instrument selected at startup.
    pub instrument: u32,
    /// Held voice limit. `0` means unbounded.
    pub polyphony: usize,
    /// Build the convolution reverb.
    pub reverb: bool,
    /// Fixed seed for per-voice randomization and reverb noise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SynthSection {
    fn default() -> Self {
        let options = SynthOptions::default();
        Self {
            master_volume: options.master_volume,
            instrument: options.instrument,
            polyphony: options.polyphony.unwrap_or(0),
            reverb: options.reverb,
            seed: options.seed,
        }
    }
}

/// Complete configuration: audio, synth and custom instruments.
///
/// Missing sections and fields take their defaults, so an empty file is a
/// valid configuration.
///
/// # Example
///
/// ```rust
/// use cantor_config::SynthConfig;
///
/// let config = SynthConfig::from_toml(
///     r#"
///     [synth]
///     instrument = 20
///
///     [[instruments]]
///     id = 20
///     name = "Glass Pad"
///     category = "pad"
///     waveform = "sine"
///     envelope = { attack = 0.6, decay = 0.4, sustain = 0.7, release = 1.5 }
///     "#,
/// )
/// .unwrap();
///
/// let synth = config.build_synth().unwrap();
/// assert_eq!(synth.current_instrument().name, "Glass Pad");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Output device settings.
    pub audio: AudioSection,
    /// Synthesizer settings.
    pub synth: SynthSection,
    /// Custom instruments, overriding factory ids or adding new ones.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instruments: Vec<InstrumentPreset>,
}

impl SynthConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            path = %path.display(),
            instruments = config.instruments.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_config(self)?)
    }

    /// The factory table merged with the custom instruments.
    pub fn preset_table(&self) -> Result<PresetTable, ConfigError> {
        self.validate()?;
        Ok(PresetTable::factory().with_overrides(self.instruments.iter().cloned())?)
    }

    /// Construction options for a [`Synth`].
    pub fn synth_options(&self) -> SynthOptions {
        SynthOptions {
            sample_rate: self.audio.sample_rate as f32,
            master_volume: self.synth.master_volume,
            instrument: self.synth.instrument,
            polyphony: (self.synth.polyphony > 0).then_some(self.synth.polyphony),
            reverb: self.synth.reverb,
            seed: self.synth.seed,
        }
    }

    /// Validate, merge the instrument table and build a synthesizer.
    pub fn build_synth(&self) -> Result<Synth, ConfigError> {
        let presets = self.preset_table()?;
        Ok(Synth::with_presets(self.synth_options(), presets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = SynthConfig::from_toml("").unwrap();
        assert_eq!(config, SynthConfig::default());
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.synth.polyphony, 32);
        assert!(config.synth.reverb);
        assert!(config.instruments.is_empty());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = SynthConfig::from_toml("[synth]\nmaster_volume = 0.8\n").unwrap();
        assert_eq!(config.synth.master_volume, 0.8);
        assert_eq!(config.synth.instrument, 0);
        assert_eq!(config.audio.sample_rate, 48000);
    }

    #[test]
    fn zero_polyphony_is_unbounded() {
        let mut config = SynthConfig::default();
        assert_eq!(config.synth_options().polyphony, Some(32));
        config.synth.polyphony = 0;
        assert_eq!(config.synth_options().polyphony, None);
    }

    #[test]
    fn options_follow_sections() {
        let config = SynthConfig::from_toml(
            "[audio]\nsample_rate = 44100\n[synth]\nreverb = false\nseed = 9\ninstrument = 6\n",
        )
        .unwrap();
        let options = config.synth_options();
        assert_eq!(options.sample_rate, 44100.0);
        assert!(!options.reverb);
        assert_eq!(options.seed, Some(9));
        assert_eq!(options.instrument, 6);
    }

    #[test]
    fn default_serializes_without_instruments() {
        let text = SynthConfig::default().to_toml().unwrap();
        assert!(text.contains("[audio]"), "{text}");
        assert!(text.contains("[synth]"), "{text}");
        assert!(!text.contains("instruments"), "{text}");
        assert!(!text.contains("seed"), "{text}");
    }

    #[test]
    fn unknown_category_is_a_parse_error() {
        let err = SynthConfig::from_toml(
            "[[instruments]]\nid = 3\nname = \"x\"\ncategory = \"kazoo\"\nwaveform = \"sine\"\n\
             envelope = { attack = 0.1, decay = 0.1, sustain = 0.5, release = 0.1 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}
