//! Range validation for instruments and configuration.
//!
//! Every violation is collected, not just the first, so a user editing a
//! config file sees all problems at once. Field names are dotted paths such as
//! `instruments[20].envelope.sustain`.
//!
//! # Example
//!
//! ```rust
//! use cantor_config::validation::validate_preset;
//! use cantor_synth::PresetTable;
//!
//! let table = PresetTable::factory();
//! assert!(table.iter().all(|p| validate_preset(p).is_ok()));
//!
//! let mut broken = table.get(0).clone();
//! broken.envelope.sustain = 1.5;
//! assert!(validate_preset(&broken).is_err());
//! ```

use cantor_synth::InstrumentPreset;
use thiserror::Error;

use crate::config::SynthConfig;

/// Lowest accepted output sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest accepted output sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Longest accepted envelope stage in seconds.
pub const MAX_STAGE_SECONDS: f64 = 30.0;

/// Highest accepted filter cutoff in Hz.
pub const MAX_CUTOFF_HZ: f64 = 96_000.0;

/// Largest accepted detune or modulation depth in cents.
pub const MAX_CENTS: f64 = 4800.0;

/// Highest accepted LFO rate in Hz.
pub const MAX_LFO_HZ: f64 = 50.0;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its accepted range.
    #[error("{field} value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the field.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// NaN or infinite value.
    #[error("{field} is not a finite number")]
    NotFinite {
        /// Dotted path of the field.
        field: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects violations under a field prefix.
struct Checker {
    prefix: String,
    errors: Vec<ValidationError>,
}

impl Checker {
    fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            errors: Vec::new(),
        }
    }

    fn field(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    fn range(&mut self, name: &str, value: impl Into<f64>, min: f64, max: f64) {
        let value = value.into();
        if !value.is_finite() {
            self.errors.push(ValidationError::NotFinite {
                field: self.field(name),
            });
        } else if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: self.field(name),
                value,
                min,
                max,
            });
        }
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

fn check_preset(c: &mut Checker, preset: &InstrumentPreset) {
    let env = preset.envelope;
    c.range("envelope.attack", env.attack, 0.0, MAX_STAGE_SECONDS);
    c.range("envelope.decay", env.decay, 0.0, MAX_STAGE_SECONDS);
    c.range("envelope.sustain", env.sustain, 0.0, 1.0);
    c.range("envelope.release", env.release, 0.0, MAX_STAGE_SECONDS);
    c.range("reverb_mix", preset.reverb_mix, 0.0, 1.0);

    for (i, &amp) in preset.harmonics.iter().enumerate() {
        c.range(&format!("harmonics[{i}]"), amp, 0.0, 1.0);
    }
    if let Some(second) = preset.secondary {
        c.range("secondary.detune_cents", second.detune_cents, -MAX_CENTS, MAX_CENTS);
        c.range("secondary.volume", second.volume, 0.0, 1.0);
    }
    if let Some(filter) = preset.filter {
        c.range("filter.cutoff", filter.cutoff, 1.0, MAX_CUTOFF_HZ);
        c.range("filter.q", filter.q, 0.01, 100.0);
        c.range(
            "filter.envelope_amount",
            filter.envelope_amount,
            -MAX_CUTOFF_HZ,
            MAX_CUTOFF_HZ,
        );
    }
    if let Some(vibrato) = preset.vibrato {
        c.range("vibrato.rate", vibrato.rate, 0.0, MAX_LFO_HZ);
        c.range("vibrato.depth_cents", vibrato.depth_cents, 0.0, MAX_CENTS);
    }
    if let Some(tremolo) = preset.tremolo {
        c.range("tremolo.rate", tremolo.rate, 0.0, MAX_LFO_HZ);
    }
    if let Some(chorus) = preset.chorus {
        c.range("chorus.depth_cents", chorus.depth_cents, 0.0, MAX_CENTS);
    }
}

/// Check one instrument against the documented field ranges.
pub fn validate_preset(preset: &InstrumentPreset) -> ValidationResult<()> {
    let mut checker = Checker::new("");
    check_preset(&mut checker, preset);
    checker.finish()
}

/// Check a whole configuration, including every custom instrument.
pub fn validate_config(config: &SynthConfig) -> ValidationResult<()> {
    let mut checker = Checker::new("audio");
    checker.range(
        "sample_rate",
        config.audio.sample_rate,
        f64::from(MIN_SAMPLE_RATE),
        f64::from(MAX_SAMPLE_RATE),
    );

    checker.prefix = "synth".into();
    checker.range("master_volume", config.synth.master_volume, 0.0, 1.0);

    for preset in &config.instruments {
        checker.prefix = format!("instruments[{}]", preset.id);
        check_preset(&mut checker, preset);
    }
    checker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_synth::{Vibrato, factory_presets};

    #[test]
    fn factory_presets_are_valid() {
        for preset in factory_presets() {
            assert_eq!(validate_preset(&preset), Ok(()), "{}", preset.name);
        }
    }

    #[test]
    fn single_violation_is_not_wrapped() {
        let mut preset = factory_presets().remove(0);
        preset.reverb_mix = 2.0;
        assert_eq!(
            validate_preset(&preset),
            Err(ValidationError::OutOfRange {
                field: "reverb_mix".into(),
                value: 2.0,
                min: 0.0,
                max: 1.0
            })
        );
    }

    #[test]
    fn every_violation_is_reported() {
        let mut preset = factory_presets().remove(6);
        preset.envelope.attack = -1.0;
        preset.harmonics = vec![0.5, 3.0].into();
        preset.vibrato = Some(Vibrato {
            rate: f32::NAN,
            depth_cents: 5.0,
        });

        let Err(ValidationError::Multiple(errors)) = validate_preset(&preset) else {
            panic!("expected multiple errors");
        };
        assert_eq!(errors.len(), 3);
        let text = ValidationError::Multiple(errors).to_string();
        assert!(text.contains("envelope.attack"), "{text}");
        assert!(text.contains("harmonics[1]"), "{text}");
        assert!(text.contains("vibrato.rate is not a finite number"), "{text}");
    }

    #[test]
    fn config_fields_are_prefixed() {
        let mut config = SynthConfig::default();
        config.audio.sample_rate = 1000;
        config.synth.master_volume = 1.5;
        let mut custom = factory_presets().remove(3);
        custom.id = 42;
        custom.envelope.sustain = -0.5;
        config.instruments.push(custom);

        let Err(ValidationError::Multiple(errors)) = validate_config(&config) else {
            panic!("expected multiple errors");
        };
        let fields: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::OutOfRange { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            [
                "audio.sample_rate",
                "synth.master_volume",
                "instruments[42].envelope.sustain"
            ]
        );
    }
}
