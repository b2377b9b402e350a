//! The synthesizer facade.
//!
//! [`Synth`] ties the pieces together: it owns the audio clock, the preset
//! table, the voice registry and the shared reverb. Its playback operations
//! never fail; bad input is logged and ignored, and a missing reverb only
//! means voices play dry.

use std::time::Duration;

use cantor_core::{AudioContext, ContextState, RENDER_QUANTUM};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::ReverbError;
use crate::impulse::{HallImpulse, ImpulseGenerator, ImpulseLoader, ReverbBus};
use crate::preset::{DEFAULT_PRESET_ID, InstrumentPreset, PresetTable};
use crate::registry::{PlayOutcome, VoiceRegistry};
use crate::voice::{Voice, VoiceBuilder, VoiceRequest};

/// Sample rate used when the requested one is unusable.
const FALLBACK_SAMPLE_RATE: f32 = 48000.0;

/// Construction options for a [`Synth`].
#[derive(Clone, Debug, PartialEq)]
pub struct SynthOptions {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Initial master volume in `[0, 1]`.
    pub master_volume: f32,
    /// Initial instrument id.
    pub instrument: u32,
    /// Maximum held voices before the oldest is stolen; `None` is unbounded.
    pub polyphony: Option<usize>,
    /// Whether to build the convolution reverb.
    pub reverb: bool,
    /// Seed for chorus randomization and reverb noise; `None` uses OS entropy.
    pub seed: Option<u64>,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            master_volume: 0.5,
            instrument: DEFAULT_PRESET_ID,
            polyphony: Some(32),
            reverb: true,
            seed: None,
        }
    }
}

enum ReverbSlot {
    /// Reverb was not requested.
    Disabled,
    Pending(ImpulseLoader),
    Ready(Box<ReverbBus>),
    /// Generation failed; voices stay dry for the life of the synth.
    Unavailable,
}

impl std::fmt::Debug for ReverbSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disabled => "Disabled",
            Self::Pending(_) => "Pending",
            Self::Ready(_) => "Ready",
            Self::Unavailable => "Unavailable",
        })
    }
}

/// Polyphonic preset synthesizer.
///
/// # Example
///
/// ```rust
/// use cantor_synth::{Synth, SynthOptions};
///
/// let mut synth = Synth::new(SynthOptions {
///     sample_rate: 16000.0,
///     reverb: false,
///     ..SynthOptions::default()
/// });
///
/// synth.set_instrument(6); // Strings
/// synth.play_note("A4", 440.0);
/// synth.play_note("A4", 440.0); // already sounding: ignored
/// assert_eq!(synth.active_note_count(), 1);
///
/// let mut left = vec![0.0; 512];
/// let mut right = vec![0.0; 512];
/// synth.render(&mut left, &mut right);
///
/// synth.stop_note("A4");
/// ```
#[derive(Debug)]
pub struct Synth {
    context: AudioContext,
    presets: PresetTable,
    current: u32,
    master_volume: f32,
    builder: VoiceBuilder,
    registry: VoiceRegistry,
    reverb: ReverbSlot,
    rng: StdRng,
    dry: Vec<f32>,
    wet: Vec<f32>,
    out_l: Vec<f32>,
    out_r: Vec<f32>,
    /// Read position in `out_l`/`out_r`; `RENDER_QUANTUM` means exhausted.
    cursor: usize,
}

impl Synth {
    /// Synth with the factory presets and the hall reverb.
    pub fn new(options: SynthOptions) -> Self {
        Self::with_presets(options, PresetTable::factory())
    }

    /// Synth with a custom preset table and the hall reverb.
    pub fn with_presets(options: SynthOptions, presets: PresetTable) -> Self {
        let hall = options
            .seed
            .map_or_else(HallImpulse::new, HallImpulse::with_seed);
        Self::with_impulse_generator(options, presets, hall)
    }

    /// Synth whose reverb impulse comes from `generator`.
    ///
    /// Generation starts immediately on a background thread. Until it
    /// finishes, or if it fails, voices play dry.
    pub fn with_impulse_generator<G: ImpulseGenerator>(
        options: SynthOptions,
        presets: PresetTable,
        generator: G,
    ) -> Self {
        let sample_rate = if options.sample_rate.is_finite() && options.sample_rate > 0.0 {
            options.sample_rate
        } else {
            tracing::warn!(
                sample_rate = options.sample_rate,
                fallback = FALLBACK_SAMPLE_RATE,
                "unusable sample rate"
            );
            FALLBACK_SAMPLE_RATE
        };

        let reverb = if options.reverb {
            ReverbSlot::Pending(ImpulseLoader::spawn(generator, sample_rate, RENDER_QUANTUM))
        } else {
            ReverbSlot::Disabled
        };

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut synth = Self {
            context: AudioContext::new(sample_rate),
            presets,
            current: DEFAULT_PRESET_ID,
            master_volume: 0.5,
            builder: VoiceBuilder::new(sample_rate),
            registry: VoiceRegistry::with_polyphony(options.polyphony),
            reverb,
            rng,
            dry: vec![0.0; RENDER_QUANTUM],
            wet: vec![0.0; RENDER_QUANTUM],
            out_l: vec![0.0; RENDER_QUANTUM],
            out_r: vec![0.0; RENDER_QUANTUM],
            cursor: RENDER_QUANTUM,
        };
        synth.set_volume(options.master_volume);
        synth.set_instrument(options.instrument);
        synth
    }

    /// Select the preset for future notes. Sounding voices are unaffected.
    ///
    /// Unknown ids select the default preset.
    pub fn set_instrument(&mut self, id: u32) {
        let preset = self.presets.get(id);
        if preset.id != id {
            tracing::info!(requested = id, fallback = preset.id, "unknown instrument");
        }
        self.current = preset.id;
        tracing::info!(id = preset.id, name = %preset.name, "instrument selected");
    }

    /// The preset future notes will use.
    pub fn current_instrument(&self) -> &InstrumentPreset {
        self.presets.get(self.current)
    }

    /// The full preset catalog.
    pub fn instruments(&self) -> &PresetTable {
        &self.presets
    }

    /// Set master volume for future notes, clamped to `[0, 1]`.
    ///
    /// Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            tracing::warn!(volume, "ignoring non-finite volume");
            return;
        }
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Current master volume.
    pub fn volume(&self) -> f32 {
        self.master_volume
    }

    /// Change the polyphony limit.
    pub fn set_polyphony(&mut self, limit: Option<usize>) {
        self.registry.set_polyphony(limit);
    }

    /// Start a note unless `key` is already sounding.
    ///
    /// Resumes a suspended context. Non-finite or non-positive frequencies
    /// are dropped.
    pub fn play_note(&mut self, key: &str, frequency: f32) {
        if !frequency.is_finite() || frequency <= 0.0 {
            tracing::warn!(key, frequency, "dropping note with invalid frequency");
            return;
        }
        if self.context.state() == ContextState::Closed {
            tracing::debug!(key, "context closed; note ignored");
            return;
        }
        if self.context.resume() {
            tracing::debug!("context resumed");
        }
        self.poll_reverb();

        let now = self.context.current_time();
        let preset = self.presets.get(self.current);
        let master_volume = self.master_volume;
        let reverb_ready = self.reverb_ready();
        let builder = self.builder;
        let rng = &mut self.rng;

        let outcome = self.registry.play(key, now, |generation| {
            builder.build(
                VoiceRequest {
                    key,
                    generation,
                    preset,
                    frequency,
                    master_volume,
                    now,
                    reverb_ready,
                },
                rng,
            )
        });

        match outcome {
            PlayOutcome::AlreadyHeld => tracing::trace!(key, "note already sounding"),
            PlayOutcome::Started {
                generation,
                retriggered,
                stolen,
            } => tracing::debug!(
                key,
                frequency,
                generation,
                retriggered,
                stolen = stolen.as_deref(),
                preset = preset.id,
                at = now,
                "note on"
            ),
        }
    }

    /// Release the note for `key`. Unknown or releasing keys are ignored.
    pub fn stop_note(&mut self, key: &str) {
        let now = self.context.current_time();
        if let Some(due) = self.registry.stop(key, now) {
            tracing::debug!(key, at = now, teardown = due, "note off");
        }
    }

    /// Release every held note.
    pub fn stop_all_notes(&mut self) {
        let now = self.context.current_time();
        let released = self.registry.stop_all(now);
        if released > 0 {
            tracing::debug!(released, at = now, "all notes off");
        }
    }

    /// Voices currently sounding, including those still releasing.
    pub fn active_note_count(&self) -> usize {
        self.registry.active_count()
    }

    /// The registered voice for `key`.
    pub fn voice(&self, key: &str) -> Option<&Voice> {
        self.registry.get(key)
    }

    /// Registered voices in key order.
    pub fn voices(&self) -> impl Iterator<Item = (&str, &Voice)> {
        self.registry.iter()
    }

    /// Whether the shared reverb is ready for new voices.
    pub fn reverb_ready(&self) -> bool {
        matches!(self.reverb, ReverbSlot::Ready(_))
    }

    /// Whether the reverb is still being generated.
    pub fn reverb_pending(&self) -> bool {
        matches!(self.reverb, ReverbSlot::Pending(_))
    }

    /// Pick up a finished impulse without blocking.
    ///
    /// Called by [`play_note`](Self::play_note) and [`render`](Self::render);
    /// exposed for hosts that want the reverb before the first note.
    pub fn poll_reverb(&mut self) -> bool {
        let result = match &mut self.reverb {
            ReverbSlot::Pending(loader) => loader.poll(),
            _ => None,
        };
        if let Some(result) = result {
            self.install_reverb(result);
        }
        self.reverb_ready()
    }

    /// Block up to `timeout` for the reverb. Returns whether it is ready.
    pub fn wait_for_reverb(&mut self, timeout: Duration) -> bool {
        let result = match &mut self.reverb {
            ReverbSlot::Pending(loader) => loader.wait(timeout),
            _ => None,
        };
        if let Some(result) = result {
            self.install_reverb(result);
        }
        self.reverb_ready()
    }

    fn install_reverb(&mut self, result: Result<ReverbBus, ReverbError>) {
        self.reverb = match result {
            Ok(bus) => {
                tracing::info!(
                    frames = bus.impulse().len(),
                    seconds = bus.impulse().duration(),
                    "reverb ready"
                );
                ReverbSlot::Ready(Box::new(bus))
            }
            Err(err) => {
                tracing::warn!(error = %err, "reverb unavailable; voices play dry");
                ReverbSlot::Unavailable
            }
        };
    }

    /// The audio clock.
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Current context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.context.sample_rate()
    }

    /// Freeze the clock. Rendering produces silence until resumed.
    pub fn suspend(&mut self) {
        if self.context.suspend() {
            tracing::debug!("context suspended");
        }
    }

    /// Resume a suspended clock.
    pub fn resume(&mut self) {
        if self.context.resume() {
            tracing::debug!("context resumed");
        }
    }

    /// Discard the context: every voice is torn down and no further notes play.
    pub fn close(&mut self) {
        self.registry.clear();
        self.context.close();
        tracing::debug!("context closed");
    }

    /// Fill `left` and `right` with the next frames of output.
    ///
    /// Output overwrites the buffers. While the context is not running the
    /// buffers are zeroed and time does not advance.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        left.fill(0.0);
        right.fill(0.0);
        if !self.context.is_running() {
            return;
        }
        self.poll_reverb();

        let mut written = 0;
        while written < frames {
            if self.cursor == RENDER_QUANTUM {
                self.render_quantum();
            }
            let n = (RENDER_QUANTUM - self.cursor).min(frames - written);
            let src = self.cursor..self.cursor + n;
            left[written..written + n].copy_from_slice(&self.out_l[src.clone()]);
            right[written..written + n].copy_from_slice(&self.out_r[src]);
            self.cursor += n;
            written += n;
        }
    }

    fn render_quantum(&mut self) {
        let start = self.context.current_time();
        let period = self.context.sample_period();

        self.dry.fill(0.0);
        self.wet.fill(0.0);
        self.registry
            .render(start, period, &mut self.dry, &mut self.wet);

        self.out_l.copy_from_slice(&self.dry);
        self.out_r.copy_from_slice(&self.dry);
        if let ReverbSlot::Ready(bus) = &mut self.reverb {
            bus.process_into(&self.wet, &mut self.out_l, &mut self.out_r);
        }

        self.context.advance(RENDER_QUANTUM);
        self.cursor = 0;

        let reaped = self.registry.reap(self.context.current_time());
        if reaped > 0 {
            tracing::debug!(reaped, remaining = self.registry.active_count(), "voices torn down");
        }
    }
}
