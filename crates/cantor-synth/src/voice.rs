//! Voices: the node graph for one sounding note.
//!
//! ```text
//!   primary ──┐ (chorus detune)
//!   second  ──┼──▶ Σ ──▶ × gain ──▶ [filter] ──┬── × dry ──▶ out
//!   2f 3f … ──┘    ▲      ▲                    └── × wet ──▶ reverb bus
//!                  │      └ envelope × (1 + tremolo)
//!                  └ vibrato detunes every oscillator
//! ```
//!
//! [`VoiceBuilder::build`] assembles the graph from a preset and programs the
//! envelope; [`Voice::render`] evaluates it one quantum at a time;
//! [`Voice::teardown`] stops every node individually.

use std::borrow::Cow;

use cantor_core::{
    AutomationEvent, AutomationParam, Biquad, FilterType, Lfo, RENDER_QUANTUM, cents_to_ratio,
};
use rand::Rng;
use serde::Serialize;

use crate::envelope::{self, VoicePhase, schedule_attack, schedule_filter_sweep, schedule_release};
use crate::oscillator::Oscillator;
use crate::preset::{FilterSettings, InstrumentPreset, Waveform};

/// Gain of a harmonic partial relative to its preset amplitude.
pub const HARMONIC_GAIN: f32 = 0.3;

/// Fixed tremolo modulation index; the envelope gain is scaled by `1 ± depth`.
pub const TREMOLO_DEPTH: f32 = 0.1;

/// Slowest chorus LFO rate in Hz.
pub const CHORUS_RATE_MIN: f32 = 0.5;

/// Fastest chorus LFO rate in Hz.
pub const CHORUS_RATE_MAX: f32 = 1.0;

/// What an oscillator contributes to the voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToneRole {
    /// The preset's main oscillator at the note frequency.
    Primary,
    /// The detuned second oscillator.
    Secondary,
    /// A sine partial at `number × f`.
    Harmonic {
        /// Harmonic number, starting at 2.
        number: u32,
    },
}

/// Result of stopping one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// The node was running and is now stopped.
    Stopped,
    /// The node had already been stopped.
    AlreadyStopped,
}

/// Per-node results of [`Voice::teardown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Nodes stopped by this call.
    pub stopped: usize,
    /// Nodes that were already stopped.
    pub already_stopped: usize,
}

impl TeardownReport {
    fn record(&mut self, outcome: StopOutcome) {
        match outcome {
            StopOutcome::Stopped => self.stopped += 1,
            StopOutcome::AlreadyStopped => self.already_stopped += 1,
        }
    }
}

/// Dry/wet split of the post-filter signal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ReverbSend {
    /// Gain to the direct output, `1 - mix`.
    pub dry: f32,
    /// Gain to the reverb bus, `mix`.
    pub wet: f32,
}

#[derive(Debug, Clone)]
struct Tone {
    role: ToneRole,
    osc: Oscillator,
    frequency: f32,
    detune_cents: f32,
    detune_ratio: f32,
    gain: f32,
    chorused: bool,
    running: bool,
}

impl Tone {
    fn new(
        role: ToneRole,
        waveform: Waveform,
        frequency: f32,
        detune_cents: f32,
        gain: f32,
        sample_rate: f32,
    ) -> Self {
        let detune_ratio = cents_to_ratio(detune_cents);
        let mut osc = Oscillator::new(sample_rate, waveform);
        osc.set_frequency(frequency * detune_ratio);
        Self {
            role,
            osc,
            frequency,
            detune_cents,
            detune_ratio,
            gain,
            chorused: false,
            running: true,
        }
    }

    fn stop(&mut self) -> StopOutcome {
        if std::mem::replace(&mut self.running, false) {
            StopOutcome::Stopped
        } else {
            StopOutcome::AlreadyStopped
        }
    }
}

#[derive(Debug, Clone)]
struct Modulator {
    lfo: Lfo,
    depth: f32,
    start_phase: f32,
    running: bool,
}

impl Modulator {
    fn new(sample_rate: f32, rate: f32, depth: f32, start_phase: f32) -> Self {
        let mut lfo = Lfo::new(sample_rate, rate);
        lfo.set_phase(start_phase);
        Self {
            lfo,
            depth,
            start_phase,
            running: true,
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        self.lfo.next() * self.depth
    }

    fn stop(&mut self) -> StopOutcome {
        if std::mem::replace(&mut self.running, false) {
            StopOutcome::Stopped
        } else {
            StopOutcome::AlreadyStopped
        }
    }

    fn node(&self) -> LfoNode {
        LfoNode {
            rate: self.lfo.frequency(),
            depth: self.depth,
            start_phase: self.start_phase,
            running: self.running,
        }
    }
}

#[derive(Debug, Clone)]
struct VoiceFilter {
    biquad: Biquad,
    filter_type: FilterType,
    q: f32,
    cutoff: AutomationParam,
}

/// One sounding note.
///
/// Owned exclusively by the [`VoiceRegistry`](crate::VoiceRegistry); callers
/// only see it through shared references.
#[derive(Debug, Clone)]
pub struct Voice {
    key: String,
    generation: u64,
    preset: InstrumentPreset,
    frequency: f32,
    sample_rate: f32,
    started_at: f64,
    released_at: Option<f64>,
    teardown_at: Option<f64>,
    destroyed: bool,
    tones: Vec<Tone>,
    gain: AutomationParam,
    gain_block: Vec<f32>,
    vibrato: Option<Modulator>,
    tremolo: Option<Modulator>,
    chorus: Option<Modulator>,
    filter: Option<VoiceFilter>,
    send: Option<ReverbSend>,
}

impl Voice {
    /// Note key this voice was started for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Registry generation; distinguishes re-triggers of the same key.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The preset captured when the voice was built.
    pub fn preset(&self) -> &InstrumentPreset {
        &self.preset
    }

    /// Fundamental frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Context time the voice started at.
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Context time of note-off, if released.
    pub fn released_at(&self) -> Option<f64> {
        self.released_at
    }

    /// Context time the voice becomes eligible for teardown, if released.
    pub fn teardown_at(&self) -> Option<f64> {
        self.teardown_at
    }

    /// Whether note-off has been scheduled.
    pub fn is_released(&self) -> bool {
        self.released_at.is_some()
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The envelope timeline.
    pub fn gain(&self) -> &AutomationParam {
        &self.gain
    }

    /// Envelope gain at context time `t`, excluding tremolo.
    pub fn gain_at(&self, t: f64) -> f32 {
        self.gain.value_at(t)
    }

    /// Filter cutoff at context time `t`, if the voice has a filter.
    pub fn cutoff_at(&self, t: f64) -> Option<f32> {
        self.filter.as_ref().map(|f| f.cutoff.value_at(t))
    }

    /// Dry/wet split, or `None` when routed straight to the output.
    pub fn reverb_send(&self) -> Option<ReverbSend> {
        self.send
    }

    /// Lifecycle phase at context time `now`.
    pub fn phase_at(&self, now: f64) -> VoicePhase {
        if self.destroyed {
            return VoicePhase::Destroyed;
        }
        envelope::phase_at(&self.preset.envelope, self.started_at, self.released_at, now)
    }

    /// Number of oscillators (primary, secondary and partials).
    pub fn oscillator_count(&self) -> usize {
        self.tones.len()
    }

    /// Begin the release at `now` using the voice's own preset release time.
    ///
    /// Returns the teardown time. Releasing twice keeps the first schedule.
    pub fn release(&mut self, now: f64) -> f64 {
        self.release_over(now, self.preset.envelope.release)
    }

    /// Begin a release at `now` lasting `release` seconds.
    pub fn release_over(&mut self, now: f64, release: f32) -> f64 {
        if let Some(due) = self.teardown_at {
            return due;
        }
        let due = schedule_release(&mut self.gain, release, now);
        if let Some(filter) = &mut self.filter {
            filter.cutoff.cancel_and_hold_at_time(now);
        }
        self.released_at = Some(now);
        self.teardown_at = Some(due);
        due
    }

    /// Stop every oscillator and modulator.
    ///
    /// Each node is stopped independently; one that was already stopped is
    /// counted and skipped without affecting its siblings.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        for tone in &mut self.tones {
            let outcome = tone.stop();
            tracing::trace!(key = %self.key, role = ?tone.role, ?outcome, "oscillator stop");
            report.record(outcome);
        }
        for (name, modulator) in [
            ("vibrato", &mut self.vibrato),
            ("tremolo", &mut self.tremolo),
            ("chorus", &mut self.chorus),
        ] {
            if let Some(modulator) = modulator {
                let outcome = modulator.stop();
                tracing::trace!(key = %self.key, lfo = name, ?outcome, "lfo stop");
                report.record(outcome);
            }
        }
        self.destroyed = true;
        report
    }

    /// Render up to one quantum starting at context time `start`.
    ///
    /// Output is added into `dry` (direct path) and `wet` (reverb send).
    pub fn render(&mut self, start: f64, sample_period: f64, dry: &mut [f32], wet: &mut [f32]) {
        if self.destroyed {
            return;
        }
        let frames = dry.len().min(wet.len()).min(self.gain_block.len());
        self.gain.fill(start, sample_period, &mut self.gain_block[..frames]);

        if let Some(filter) = &mut self.filter {
            let cutoff = filter.cutoff.value_at(start);
            filter
                .biquad
                .configure(filter.filter_type, cutoff, filter.q, self.sample_rate);
        }

        for i in 0..frames {
            let vibrato = self
                .vibrato
                .as_mut()
                .map_or(1.0, |m| cents_to_ratio(m.next()));
            let chorus = self
                .chorus
                .as_mut()
                .map_or(1.0, |m| cents_to_ratio(m.next()));

            let mut sum = 0.0;
            for tone in &mut self.tones {
                let mut ratio = tone.detune_ratio * vibrato;
                if tone.chorused {
                    ratio *= chorus;
                }
                tone.osc.set_frequency(tone.frequency * ratio);
                sum += tone.osc.advance() * tone.gain;
            }

            let tremolo = self.tremolo.as_mut().map_or(0.0, Modulator::next);
            let mut sample = sum * self.gain_block[i] * (1.0 + tremolo);
            if let Some(filter) = &mut self.filter {
                sample = filter.biquad.process(sample);
            }

            match self.send {
                Some(send) => {
                    dry[i] += sample * send.dry;
                    wet[i] += sample * send.wet;
                }
                None => dry[i] += sample,
            }
        }
    }

    /// Drop envelope history before `now`.
    pub fn prune(&mut self, now: f64) {
        self.gain.prune_before(now);
        if let Some(filter) = &mut self.filter {
            filter.cutoff.prune_before(now);
        }
    }

    /// Snapshot of every node's parameters.
    pub fn graph(&self) -> VoiceGraph {
        VoiceGraph {
            key: self.key.clone(),
            generation: self.generation,
            preset_id: self.preset.id,
            preset_name: self.preset.name.clone(),
            frequency: self.frequency,
            started_at: self.started_at,
            released_at: self.released_at,
            oscillators: self
                .tones
                .iter()
                .map(|t| OscillatorNode {
                    role: t.role,
                    waveform: t.osc.waveform(),
                    frequency: t.frequency,
                    detune_cents: t.detune_cents,
                    gain: t.gain,
                    chorused: t.chorused,
                    running: t.running,
                })
                .collect(),
            envelope: self.gain.events().to_vec(),
            filter: self.filter.as_ref().map(|f| FilterNode {
                filter_type: f.filter_type,
                q: f.q,
                cutoff: f.cutoff.events().to_vec(),
            }),
            vibrato: self.vibrato.as_ref().map(Modulator::node),
            tremolo: self.tremolo.as_ref().map(Modulator::node),
            chorus: self.chorus.as_ref().map(Modulator::node),
            reverb: self.send,
        }
    }
}

/// Serializable snapshot of a voice's node graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VoiceGraph {
    /// Note key.
    pub key: String,
    /// Registry generation.
    pub generation: u64,
    /// Id of the preset the voice was built from.
    pub preset_id: u32,
    /// Name of that preset.
    pub preset_name: Cow<'static, str>,
    /// Fundamental in Hz.
    pub frequency: f32,
    /// Start time in seconds.
    pub started_at: f64,
    /// Note-off time, if released.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<f64>,
    /// Every oscillator, primary first.
    pub oscillators: Vec<OscillatorNode>,
    /// Gain automation events.
    pub envelope: Vec<AutomationEvent>,
    /// Filter, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterNode>,
    /// Vibrato LFO; depth in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<LfoNode>,
    /// Tremolo LFO; depth in gain units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<LfoNode>,
    /// Chorus LFO; depth in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chorus: Option<LfoNode>,
    /// Reverb split, absent when the voice is routed dry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverb: Option<ReverbSend>,
}

impl VoiceGraph {
    /// Harmonic partial oscillators, in harmonic order.
    pub fn harmonics(&self) -> impl Iterator<Item = &OscillatorNode> {
        self.oscillators
            .iter()
            .filter(|o| matches!(o.role, ToneRole::Harmonic { .. }))
    }
}

/// One oscillator in a [`VoiceGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OscillatorNode {
    /// Role in the voice.
    pub role: ToneRole,
    /// Waveform.
    pub waveform: Waveform,
    /// Nominal frequency before detune and modulation, in Hz.
    pub frequency: f32,
    /// Static detune in cents.
    pub detune_cents: f32,
    /// Gain into the voice's gain stage.
    pub gain: f32,
    /// Whether the chorus LFO modulates this oscillator.
    pub chorused: bool,
    /// Whether the oscillator is still running.
    pub running: bool,
}

/// The filter in a [`VoiceGraph`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterNode {
    /// Response shape.
    pub filter_type: FilterType,
    /// Resonance.
    pub q: f32,
    /// Cutoff automation events.
    pub cutoff: Vec<AutomationEvent>,
}

/// A modulation LFO in a [`VoiceGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LfoNode {
    /// Rate in Hz.
    pub rate: f32,
    /// Modulation depth.
    pub depth: f32,
    /// Phase at note start, in cycles.
    pub start_phase: f32,
    /// Whether the LFO is still running.
    pub running: bool,
}

/// Everything needed to build one voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceRequest<'a> {
    /// Note key.
    pub key: &'a str,
    /// Registry generation for the new voice.
    pub generation: u64,
    /// Preset to build from.
    pub preset: &'a InstrumentPreset,
    /// Fundamental in Hz.
    pub frequency: f32,
    /// Master volume scaling the envelope.
    pub master_volume: f32,
    /// Start time; every node starts here.
    pub now: f64,
    /// Whether the shared reverb is available.
    pub reverb_ready: bool,
}

/// Builds voices for one sample rate.
///
/// # Example
///
/// ```rust
/// use cantor_synth::{PresetTable, VoiceBuilder, VoiceRequest};
/// use rand::SeedableRng;
///
/// let table = PresetTable::factory();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let voice = VoiceBuilder::new(48000.0).build(
///     VoiceRequest {
///         key: "A4",
///         generation: 1,
///         preset: table.get(0),
///         frequency: 440.0,
///         master_volume: 1.0,
///         now: 0.0,
///         reverb_ready: false,
///     },
///     &mut rng,
/// );
///
/// // Primary, secondary and three partials
/// assert_eq!(voice.oscillator_count(), 5);
/// assert!(voice.reverb_send().is_none());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VoiceBuilder {
    sample_rate: f32,
}

impl VoiceBuilder {
    /// Create a builder for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    /// Sample rate voices are built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Assemble the node graph for one note and schedule its envelope.
    ///
    /// `rng` supplies the per-voice chorus rate and phase.
    pub fn build<R: Rng + ?Sized>(&self, request: VoiceRequest<'_>, rng: &mut R) -> Voice {
        let VoiceRequest {
            key,
            generation,
            preset,
            frequency,
            master_volume,
            now,
            reverb_ready,
        } = request;
        let sr = self.sample_rate;

        let partials = preset.harmonic_partials().count();
        let mut tones = Vec::with_capacity(1 + usize::from(preset.secondary.is_some()) + partials);

        let mut primary = Tone::new(ToneRole::Primary, preset.waveform, frequency, 0.0, 1.0, sr);
        primary.chorused = preset.chorus.is_some();
        tones.push(primary);

        if let Some(second) = preset.secondary {
            tones.push(Tone::new(
                ToneRole::Secondary,
                second.waveform,
                frequency,
                second.detune_cents,
                second.volume,
                sr,
            ));
        }

        for (number, amplitude) in preset.harmonic_partials() {
            tones.push(Tone::new(
                ToneRole::Harmonic { number },
                Waveform::Sine,
                frequency * number as f32,
                0.0,
                amplitude * HARMONIC_GAIN,
                sr,
            ));
        }

        let vibrato = preset
            .vibrato
            .map(|v| Modulator::new(sr, v.rate, v.depth_cents, 0.0));
        let tremolo = preset
            .tremolo
            .map(|t| Modulator::new(sr, t.rate, TREMOLO_DEPTH, 0.0));
        let chorus = preset.chorus.map(|c| {
            let rate = rng.random_range(CHORUS_RATE_MIN..CHORUS_RATE_MAX);
            let phase = rng.random_range(0.0..1.0);
            Modulator::new(sr, rate, c.depth_cents, phase)
        });

        let filter = preset.filter.map(|settings| build_filter(&settings, preset, sr, now));

        let send = (reverb_ready && preset.uses_reverb()).then(|| {
            let mix = preset.reverb_mix.clamp(0.0, 1.0);
            ReverbSend {
                dry: 1.0 - mix,
                wet: mix,
            }
        });

        let mut gain = AutomationParam::new(0.0);
        schedule_attack(&mut gain, &preset.envelope, master_volume, now);

        Voice {
            key: key.to_owned(),
            generation,
            preset: preset.clone(),
            frequency,
            sample_rate: sr,
            started_at: now,
            released_at: None,
            teardown_at: None,
            destroyed: false,
            tones,
            gain,
            gain_block: vec![0.0; RENDER_QUANTUM],
            vibrato,
            tremolo,
            chorus,
            filter,
            send,
        }
    }
}

fn build_filter(
    settings: &FilterSettings,
    preset: &InstrumentPreset,
    sample_rate: f32,
    now: f64,
) -> VoiceFilter {
    let mut cutoff = AutomationParam::new(settings.cutoff);
    schedule_filter_sweep(&mut cutoff, settings, &preset.envelope, now);
    let mut biquad = Biquad::new();
    biquad.configure(settings.filter_type, settings.cutoff, settings.q, sample_rate);
    VoiceFilter {
        biquad,
        filter_type: settings.filter_type,
        q: settings.q,
        cutoff,
    }
}
