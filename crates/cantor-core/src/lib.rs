//! Cantor Core - signal primitives for the cantor synthesizer
//!
//! Everything here is allocation-free once constructed and safe to call from
//! the audio thread, except [`StereoConvolver::new`], which plans FFTs.
//!
//! # Building Blocks
//!
//! - [`AudioContext`] - sample clock with suspend/resume, advanced in
//!   [`RENDER_QUANTUM`]-frame steps
//! - [`AutomationParam`] - absolute-time parameter timeline (set, linear
//!   ramp, exponential ramp, cancel, cancel-and-hold)
//! - [`Biquad`] / [`FilterType`] - RBJ cookbook second-order filter
//! - [`Lfo`] - sine modulation source
//! - [`StereoConvolver`] - partitioned FFT convolution for reverb
//!
//! ## Utilities
//!
//! - Pitch: [`cents_to_ratio`], [`midi_to_freq`], [`note_name_to_freq`]
//! - Level: [`db_to_linear`], [`linear_to_db`]
//!
//! # Features
//!
//! - `serde` - derive `Serialize`/`Deserialize` on [`FilterType`] and
//!   [`AutomationEvent`]
//! - `tracing` - debug events from expensive constructors

pub mod automation;
pub mod biquad;
pub mod context;
pub mod convolver;
pub mod lfo;
pub mod math;

pub use automation::{AutomationEvent, AutomationParam};
pub use biquad::{
    Biquad, FilterType, allpass_coefficients, bandpass_coefficients, highpass_coefficients,
    lowpass_coefficients, notch_coefficients,
};
pub use context::{AudioContext, ContextState, RENDER_QUANTUM};
pub use convolver::StereoConvolver;
pub use lfo::Lfo;
pub use math::{
    cents_to_ratio, db_to_linear, freq_to_midi, linear_to_db, midi_to_freq, note_name_to_freq,
    note_name_to_midi,
};
