//! Cantor Synth - polyphonic preset synthesizer
//!
//! Voices are built from instrument presets and driven entirely by absolute
//! automation schedules against the [`AudioContext`](cantor_core::AudioContext)
//! clock, so note timing is sample-accurate no matter when the caller asks.
//!
//! # Core Components
//!
//! ## Presets
//!
//! - [`InstrumentPreset`] - one timbre: waveform, harmonics, envelope, optional
//!   secondary oscillator, filter, vibrato, tremolo, chorus, reverb mix
//! - [`PresetTable`] - the catalog; unknown ids fall back to id 0
//!
//! ```rust
//! use cantor_synth::{Category, PresetTable};
//!
//! let table = PresetTable::factory();
//! let pads: Vec<_> = table.by_category(Category::Pad).map(|p| p.id).collect();
//! assert_eq!(pads, [14, 15]);
//! ```
//!
//! ## Oscillators
//!
//! - [`Oscillator`] - PolyBLEP band-limited oscillator
//! - [`Waveform`] - sine, square, sawtooth, triangle
//!
//! ```rust
//! use cantor_synth::{Oscillator, Waveform};
//!
//! let mut osc = Oscillator::new(48000.0, Waveform::Square);
//! osc.set_frequency(110.0);
//! let sample = osc.advance();
//! ```
//!
//! ## Voices
//!
//! - [`VoiceBuilder`] - assembles a voice's node graph and schedules its envelope
//! - [`Voice`] / [`VoiceGraph`] - a sounding note and its inspectable snapshot
//! - [`VoiceRegistry`] - one voice per key, generation-safe teardown, polyphony
//! - [`envelope`] - attack, decay, release and filter sweep scheduling
//!
//! ## Reverb
//!
//! - [`HallImpulse`] - synthetic hall impulse response
//! - [`ImpulseGenerator`] - source trait for custom impulses
//! - [`ImpulseLoader`] / [`ReverbBus`] - background generation and the shared send
//!
//! ## Facade
//!
//! - [`Synth`] / [`SynthOptions`] - select instrument, set volume, play, stop,
//!   render
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use cantor_synth::{Synth, SynthOptions};
//!
//! let mut synth = Synth::new(SynthOptions {
//!     sample_rate: 16000.0,
//!     seed: Some(7),
//!     ..SynthOptions::default()
//! });
//! synth.wait_for_reverb(Duration::from_secs(10));
//!
//! synth.play_note("C4", 261.63);
//! synth.play_note("E4", 329.63);
//!
//! let mut left = vec![0.0; 1024];
//! let mut right = vec![0.0; 1024];
//! synth.render(&mut left, &mut right);
//!
//! synth.stop_all_notes();
//! assert_eq!(synth.active_note_count(), 2); // still releasing
//! ```

pub mod envelope;
pub mod error;
pub mod impulse;
pub mod oscillator;
pub mod preset;
pub mod registry;
pub mod synth;
pub mod voice;

pub use envelope::VoicePhase;
pub use error::{PresetError, ReverbError};
pub use impulse::{HallImpulse, ImpulseGenerator, ImpulseLoader, ImpulseResponse, ReverbBus};
pub use oscillator::Oscillator;
pub use preset::{
    Adsr, Category, Chorus, DEFAULT_PRESET_ID, FilterSettings, FilterType, InstrumentPreset,
    PresetTable, SecondaryOscillator, Tremolo, Vibrato, Waveform, factory_presets,
};
pub use registry::{PlayOutcome, VoiceRegistry};
pub use synth::{Synth, SynthOptions};
pub use voice::{
    FilterNode, LfoNode, OscillatorNode, ReverbSend, StopOutcome, TeardownReport, ToneRole, Voice,
    VoiceBuilder, VoiceGraph, VoiceRequest,
};
