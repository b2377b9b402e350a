//! Configuration and custom instruments for the cantor synthesizer.
//!
//! - **Config file**: audio, synth and instrument sections in TOML
//! - **Custom instruments**: override factory presets by id or add new ones
//! - **Validation**: every numeric field checked against its range
//! - **Paths**: platform-specific configuration directory
//!
//! # Example
//!
//! ```rust,no_run
//! use cantor_config::{SynthConfig, find_config};
//!
//! let config = match find_config(None) {
//!     Some(path) => SynthConfig::load(path).unwrap(),
//!     None => SynthConfig::default(),
//! };
//! let mut synth = config.build_synth().unwrap();
//! synth.play_note("A4", 440.0);
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range validation for instruments and configuration.
pub mod validation;

pub use config::{AudioSection, SynthConfig, SynthSection};
pub use error::ConfigError;
pub use paths::{
    CONFIG_FILE, ensure_user_config_dir, find_config, user_config_dir, user_config_path,
};
pub use validation::{ValidationError, ValidationResult, validate_config, validate_preset};
