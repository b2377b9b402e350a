//! Error types for the synth crate.
//!
//! None of these escape the [`Synth`](crate::Synth) playback operations. They
//! surface only where user data is turned into engine state: building a
//! preset table, or from an impulse generator (where they are logged and the
//! reverb stays dry).

use thiserror::Error;

/// Failure to produce the shared reverb impulse.
#[derive(Debug, Error)]
pub enum ReverbError {
    /// Sample rate is zero, negative or not finite.
    #[error("invalid sample rate for impulse response: {0}")]
    InvalidSampleRate(f32),

    /// The impulse buffer could not be allocated.
    #[error("failed to allocate {frames} frame impulse response")]
    Allocation {
        /// Requested frames per channel.
        frames: usize,
    },

    /// A custom generator reported a failure.
    #[error("impulse generator failed: {0}")]
    Generator(String),

    /// The background worker thread could not be started.
    #[error("failed to spawn impulse worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker exited without delivering a result.
    #[error("impulse worker disconnected before delivering a result")]
    Disconnected,
}

/// Invalid instrument preset table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresetError {
    /// The table has no presets.
    #[error("preset table is empty")]
    Empty,

    /// No preset with id 0, which unknown ids fall back to.
    #[error("preset table has no default preset (id 0)")]
    MissingDefault,

    /// Two presets share an id.
    #[error("duplicate preset id {0}")]
    DuplicateId(u32),
}
