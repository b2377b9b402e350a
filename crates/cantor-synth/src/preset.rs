//! Instrument presets and the factory preset table.
//!
//! A preset is a total, typed description of one timbre. Optional stages
//! (secondary oscillator, filter, modulators) are `Option`s; absent means
//! the stage is not built. Harmonic amplitudes are indexed from the 2nd
//! harmonic: `harmonics[0]` is the partial at `2f`, `harmonics[1]` at `3f`.
//!
//! The factory table ships 20 instruments (ids 0-19). Lookup never fails:
//! an unknown id resolves to the default preset, id 0.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PresetError;
pub use cantor_core::FilterType;

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    /// Pure fundamental.
    #[default]
    Sine,
    /// Odd harmonics, hollow.
    Square,
    /// All harmonics, bright.
    Sawtooth,
    /// Odd harmonics falling at 12 dB/octave, soft.
    Triangle,
}

impl Waveform {
    /// Every waveform, in declaration order.
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// Lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instrument family, used for grouping in listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Acoustic and electric pianos.
    Piano,
    /// Drawbar and pipe organs.
    Organ,
    /// Bowed strings.
    Strings,
    /// Brass section and solo brass.
    Brass,
    /// Flutes and reeds.
    Woodwind,
    /// Synthesizer leads.
    Synth,
    /// Sustained pads.
    Pad,
    /// Bells and mallets.
    Bells,
    /// Bass instruments.
    Bass,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 9] = [
        Category::Piano,
        Category::Organ,
        Category::Strings,
        Category::Brass,
        Category::Woodwind,
        Category::Synth,
        Category::Pad,
        Category::Bells,
        Category::Bass,
    ];

    /// Lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Piano => "piano",
            Self::Organ => "organ",
            Self::Strings => "strings",
            Self::Brass => "brass",
            Self::Woodwind => "woodwind",
            Self::Synth => "synth",
            Self::Pad => "pad",
            Self::Bells => "bells",
            Self::Bass => "bass",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amplitude envelope timings in seconds; `sustain` is a level in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adsr {
    /// Time to reach the attack peak.
    pub attack: f32,
    /// Time from the peak to the sustain level.
    pub decay: f32,
    /// Held level relative to master volume.
    pub sustain: f32,
    /// Time to fade to silence after note-off.
    pub release: f32,
}

/// A second, statically detuned oscillator summed with the primary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecondaryOscillator {
    /// Waveform of the second oscillator.
    pub waveform: Waveform,
    /// Pitch offset from the note frequency, in cents.
    #[serde(default)]
    pub detune_cents: f32,
    /// Gain relative to the primary, in `[0, 1]`.
    pub volume: f32,
}

/// Per-voice filter between the gain stage and the output split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Response shape.
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    /// Resting cutoff in Hz.
    pub cutoff: f32,
    /// Resonance.
    #[serde(default = "default_q")]
    pub q: f32,
    /// Upward cutoff sweep during the attack, in Hz. Zero disables the sweep.
    #[serde(default)]
    pub envelope_amount: f32,
}

fn default_q() -> f32 {
    1.0
}

/// Pitch modulation applied to every oscillator of a voice in unison.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    /// LFO rate in Hz.
    pub rate: f32,
    /// Peak deviation in cents.
    pub depth_cents: f32,
}

/// Amplitude wobble added to the envelope gain at a fixed depth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tremolo {
    /// LFO rate in Hz.
    pub rate: f32,
}

/// Slow, per-voice randomized pitch drift on the primary oscillator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chorus {
    /// Peak deviation in cents.
    pub depth_cents: f32,
}

/// One instrument timbre.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPreset {
    /// Unique id within a table.
    pub id: u32,
    /// Display name.
    pub name: Cow<'static, str>,
    /// Instrument family.
    pub category: Category,
    /// Primary oscillator waveform.
    pub waveform: Waveform,
    /// Relative amplitudes of harmonics 2, 3, 4, ... in `[0, 1]`; zero skips.
    #[serde(default, skip_serializing_if = "harmonics_empty")]
    pub harmonics: Cow<'static, [f32]>,
    /// Wet share of the reverb send in `[0, 1]`.
    #[serde(default)]
    pub reverb_mix: f32,
    /// Amplitude envelope.
    pub envelope: Adsr,
    /// Optional detuned second oscillator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondaryOscillator>,
    /// Optional filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterSettings>,
    /// Optional vibrato.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    /// Optional tremolo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    /// Optional chorus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chorus: Option<Chorus>,
}

fn harmonics_empty(harmonics: &Cow<'static, [f32]>) -> bool {
    harmonics.is_empty()
}

impl InstrumentPreset {
    /// Audible harmonic partials as `(harmonic_number, amplitude)`.
    ///
    /// Harmonic numbers start at 2; zero amplitudes are skipped.
    pub fn harmonic_partials(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.harmonics
            .iter()
            .enumerate()
            .filter(|&(_, &amp)| amp > 0.0)
            .map(|(k, &amp)| (k as u32 + 2, amp))
    }

    /// Whether voices of this preset send to the reverb bus.
    pub fn uses_reverb(&self) -> bool {
        self.reverb_mix > 0.0
    }
}

const fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Adsr {
    Adsr {
        attack,
        decay,
        sustain,
        release,
    }
}

const fn second(
    waveform: Waveform,
    detune_cents: f32,
    volume: f32,
) -> Option<SecondaryOscillator> {
    Some(SecondaryOscillator {
        waveform,
        detune_cents,
        volume,
    })
}

const fn filter(
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    envelope_amount: f32,
) -> Option<FilterSettings> {
    Some(FilterSettings {
        filter_type,
        cutoff,
        q,
        envelope_amount,
    })
}

const fn vibrato(rate: f32, depth_cents: f32) -> Option<Vibrato> {
    Some(Vibrato { rate, depth_cents })
}

const fn tremolo(rate: f32) -> Option<Tremolo> {
    Some(Tremolo { rate })
}

const fn chorus(depth_cents: f32) -> Option<Chorus> {
    Some(Chorus { depth_cents })
}

macro_rules! preset {
    (
        $id:literal, $name:literal, $category:ident, $waveform:ident,
        harmonics: [$($h:expr),* $(,)?],
        envelope: $env:expr,
        reverb: $reverb:expr
        $(, secondary: $secondary:expr)?
        $(, filter: $filter:expr)?
        $(, vibrato: $vibrato:expr)?
        $(, tremolo: $tremolo:expr)?
        $(, chorus: $chorus:expr)?
        $(,)?
    ) => {
        InstrumentPreset {
            id: $id,
            name: Cow::Borrowed($name),
            category: Category::$category,
            waveform: Waveform::$waveform,
            harmonics: Cow::Borrowed(&[$($h),*]),
            reverb_mix: $reverb,
            envelope: $env,
            secondary: None $(.or($secondary))?,
            filter: None $(.or($filter))?,
            vibrato: None $(.or($vibrato))?,
            tremolo: None $(.or($tremolo))?,
            chorus: None $(.or($chorus))?,
        }
    };
}

use FilterType::{Highpass, Lowpass};
use Waveform::{Sawtooth, Sine, Square, Triangle};

/// Build the 20 factory instruments, ids 0-19.
pub fn factory_presets() -> Vec<InstrumentPreset> {
    vec![
        preset!(0, "Acoustic Piano", Piano, Triangle,
            harmonics: [0.7, 0.4, 0.25],
            envelope: adsr(0.002, 0.8, 0.2, 1.2),
            reverb: 0.25,
            secondary: second(Sine, 2.0, 0.3),
            filter: filter(Lowpass, 4000.0, 1.0, 2000.0)),
        preset!(1, "Bright Piano", Piano, Triangle,
            harmonics: [0.5, 0.3],
            envelope: adsr(0.002, 0.2, 0.5, 0.4),
            reverb: 0.2,
            secondary: second(Sawtooth, 1.0, 0.15),
            filter: filter(Highpass, 200.0, 0.5, 0.0)),
        preset!(2, "Electric Piano", Piano, Sine,
            harmonics: [0.3, 0.0, 0.15],
            envelope: adsr(0.01, 0.5, 0.3, 0.8),
            reverb: 0.2,
            secondary: second(Triangle, 5.0, 0.4),
            tremolo: tremolo(5.0),
            chorus: chorus(6.0)),
        preset!(3, "Honky-tonk", Piano, Triangle,
            harmonics: [],
            envelope: adsr(0.005, 0.25, 0.35, 0.4),
            reverb: 0.1,
            secondary: second(Triangle, 15.0, 0.5)),
        preset!(4, "Organ", Organ, Sine,
            harmonics: [0.5, 0.3, 0.2, 0.1],
            envelope: adsr(0.05, 0.1, 0.9, 0.1),
            reverb: 0.2,
            secondary: second(Sine, 1200.0, 0.5),
            tremolo: tremolo(6.0)),
        preset!(5, "Church Organ", Organ, Sine,
            harmonics: [0.6, 0.4, 0.3, 0.2, 0.1],
            envelope: adsr(0.1, 0.2, 0.85, 0.3),
            reverb: 0.5,
            secondary: second(Triangle, 1200.0, 0.6)),
        preset!(6, "Strings", Strings, Sawtooth,
            harmonics: [],
            envelope: adsr(0.2, 0.3, 0.7, 0.5),
            reverb: 0.35,
            secondary: second(Sawtooth, 7.0, 0.5),
            filter: filter(Lowpass, 3000.0, 1.0, 0.0),
            vibrato: vibrato(5.0, 5.0),
            chorus: chorus(8.0)),
        preset!(7, "Violin", Strings, Sawtooth,
            harmonics: [],
            envelope: adsr(0.1, 0.2, 0.8, 0.3),
            reverb: 0.3,
            filter: filter(Lowpass, 4000.0, 2.0, 0.0),
            vibrato: vibrato(6.0, 8.0)),
        preset!(8, "Brass", Brass, Sawtooth,
            harmonics: [],
            envelope: adsr(0.05, 0.2, 0.7, 0.2),
            reverb: 0.2,
            secondary: second(Square, 3.0, 0.3),
            filter: filter(Lowpass, 2500.0, 2.0, 1500.0)),
        preset!(9, "Trumpet", Brass, Sawtooth,
            harmonics: [],
            envelope: adsr(0.02, 0.1, 0.8, 0.15),
            reverb: 0.15,
            filter: filter(Lowpass, 3500.0, 3.0, 1000.0),
            vibrato: vibrato(5.0, 4.0)),
        preset!(10, "Flute", Woodwind, Sine,
            harmonics: [0.15, 0.05],
            envelope: adsr(0.1, 0.1, 0.8, 0.2),
            reverb: 0.25,
            secondary: second(Triangle, 0.0, 0.2),
            vibrato: vibrato(5.0, 6.0)),
        preset!(11, "Clarinet", Woodwind, Square,
            harmonics: [],
            envelope: adsr(0.05, 0.15, 0.7, 0.2),
            reverb: 0.2,
            filter: filter(Lowpass, 2000.0, 1.5, 0.0),
            vibrato: vibrato(4.0, 3.0)),
        preset!(12, "Synth Lead", Synth, Sawtooth,
            harmonics: [],
            envelope: adsr(0.01, 0.3, 0.6, 0.4),
            reverb: 0.15,
            secondary: second(Square, 5.0, 0.5),
            filter: filter(Lowpass, 5000.0, 3.0, 3000.0)),
        preset!(13, "Square Lead", Synth, Square,
            harmonics: [],
            envelope: adsr(0.01, 0.1, 0.7, 0.2),
            reverb: 0.1),
        preset!(14, "Synth Pad", Pad, Sine,
            harmonics: [],
            envelope: adsr(0.5, 0.3, 0.8, 1.0),
            reverb: 0.5,
            secondary: second(Triangle, 10.0, 0.6),
            filter: filter(Lowpass, 2000.0, 0.5, 0.0),
            tremolo: tremolo(3.0),
            chorus: chorus(10.0)),
        preset!(15, "Warm Pad", Pad, Triangle,
            harmonics: [],
            envelope: adsr(0.8, 0.4, 0.7, 1.2),
            reverb: 0.45,
            secondary: second(Sine, 7.0, 0.5),
            filter: filter(Lowpass, 1500.0, 1.0, 0.0),
            chorus: chorus(12.0)),
        preset!(16, "Bells", Bells, Sine,
            harmonics: [0.0, 0.4, 0.0, 0.25],
            envelope: adsr(0.001, 0.8, 0.1, 1.5),
            reverb: 0.4,
            secondary: second(Sine, 1900.0, 0.3)),
        preset!(17, "Vibraphone", Bells, Sine,
            harmonics: [0.0, 0.0, 0.2],
            envelope: adsr(0.005, 0.6, 0.2, 1.0),
            reverb: 0.35,
            tremolo: tremolo(6.0)),
        preset!(18, "Synth Bass", Bass, Sawtooth,
            harmonics: [],
            envelope: adsr(0.01, 0.2, 0.5, 0.2),
            reverb: 0.0,
            secondary: second(Square, -1200.0, 0.4),
            filter: filter(Lowpass, 1500.0, 4.0, 800.0)),
        preset!(19, "Electric Bass", Bass, Triangle,
            harmonics: [0.3],
            envelope: adsr(0.02, 0.15, 0.6, 0.25),
            reverb: 0.0,
            filter: filter(Lowpass, 1200.0, 2.0, 0.0)),
    ]
}

/// Id every unknown lookup resolves to.
pub const DEFAULT_PRESET_ID: u32 = 0;

/// Read-only catalog of presets keyed by id.
///
/// # Example
///
/// ```rust
/// use cantor_synth::PresetTable;
///
/// let table = PresetTable::factory();
/// assert_eq!(table.get(6).name, "Strings");
/// assert_eq!(table.get(99999).id, 0); // unknown ids fall back
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PresetTable {
    /// Sorted by id.
    presets: Vec<InstrumentPreset>,
}

impl PresetTable {
    /// The factory table.
    pub fn factory() -> Self {
        let mut presets = factory_presets();
        presets.sort_by_key(|p| p.id);
        Self { presets }
    }

    /// Build a table from arbitrary presets.
    ///
    /// The table must be non-empty, ids must be unique and id 0 must exist.
    pub fn new(mut presets: Vec<InstrumentPreset>) -> Result<Self, PresetError> {
        if presets.is_empty() {
            return Err(PresetError::Empty);
        }
        presets.sort_by_key(|p| p.id);
        if let Some(pair) = presets.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(PresetError::DuplicateId(pair[0].id));
        }
        if presets[0].id != DEFAULT_PRESET_ID {
            return Err(PresetError::MissingDefault);
        }
        Ok(Self { presets })
    }

    /// Replace presets with matching ids and append new ones.
    ///
    /// Duplicate ids inside `overrides` are rejected.
    pub fn with_overrides(
        self,
        overrides: impl IntoIterator<Item = InstrumentPreset>,
    ) -> Result<Self, PresetError> {
        let mut presets = self.presets;
        let mut seen = Vec::new();
        for preset in overrides {
            if seen.contains(&preset.id) {
                return Err(PresetError::DuplicateId(preset.id));
            }
            seen.push(preset.id);
            match presets.binary_search_by_key(&preset.id, |p| p.id) {
                Ok(i) => presets[i] = preset,
                Err(i) => presets.insert(i, preset),
            }
        }
        Self::new(presets)
    }

    /// Look up a preset, falling back to the default for unknown ids.
    pub fn get(&self, id: u32) -> &InstrumentPreset {
        self.lookup(id).unwrap_or_else(|| self.default_preset())
    }

    /// Look up a preset without fallback.
    pub fn lookup(&self, id: u32) -> Option<&InstrumentPreset> {
        self.presets
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.presets[i])
    }

    /// Whether `id` names a preset in this table.
    pub fn contains(&self, id: u32) -> bool {
        self.lookup(id).is_some()
    }

    /// The preset with id 0.
    pub fn default_preset(&self) -> &InstrumentPreset {
        // Construction guarantees presets[0] has id 0.
        &self.presets[0]
    }

    /// All presets in id order.
    pub fn as_slice(&self) -> &[InstrumentPreset] {
        &self.presets
    }

    /// Iterate presets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &InstrumentPreset> {
        self.presets.iter()
    }

    /// Presets of one category, in id order.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &InstrumentPreset> {
        self.presets.iter().filter(move |p| p.category == category)
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Always `false`; tables are never empty.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_has_twenty_unique_ids() {
        let table = PresetTable::factory();
        assert_eq!(table.len(), 20);
        for (i, preset) in table.iter().enumerate() {
            assert_eq!(preset.id, i as u32);
        }
        assert!(PresetTable::new(factory_presets()).is_ok());
    }

    #[test]
    fn factory_covers_every_category() {
        let table = PresetTable::factory();
        for category in Category::ALL {
            assert!(
                table.by_category(category).next().is_some(),
                "no preset in {category}"
            );
        }
    }

    #[test]
    fn factory_values_in_range() {
        for p in factory_presets() {
            let env = p.envelope;
            assert!(env.attack >= 0.0 && env.decay >= 0.0 && env.release >= 0.0, "{}", p.name);
            assert!((0.0..=1.0).contains(&env.sustain), "{}", p.name);
            assert!((0.0..=1.0).contains(&p.reverb_mix), "{}", p.name);
            assert!(p.harmonics.iter().all(|h| (0.0..=1.0).contains(h)), "{}", p.name);
            if let Some(s) = p.secondary {
                assert!((0.0..=1.0).contains(&s.volume), "{}", p.name);
            }
        }
    }

    #[test]
    fn acoustic_piano_is_default() {
        let table = PresetTable::factory();
        let piano = table.default_preset();
        assert_eq!(piano.name, "Acoustic Piano");
        assert_eq!(piano.envelope, adsr(0.002, 0.8, 0.2, 1.2));
        let partials: Vec<_> = piano.harmonic_partials().collect();
        assert_eq!(partials, vec![(2, 0.7), (3, 0.4), (4, 0.25)]);
    }

    #[test]
    fn unknown_id_falls_back() {
        let table = PresetTable::factory();
        assert_eq!(table.get(99999), table.get(0));
        assert!(table.lookup(99999).is_none());
        assert!(!table.contains(20));
    }

    #[test]
    fn zero_harmonics_are_skipped() {
        let table = PresetTable::factory();
        let bells: Vec<_> = table.get(16).harmonic_partials().collect();
        assert_eq!(bells, vec![(3, 0.4), (5, 0.25)]);
    }

    #[test]
    fn custom_table_validation() {
        assert_eq!(PresetTable::new(Vec::new()), Err(PresetError::Empty));

        let mut presets = factory_presets();
        presets.remove(0);
        assert_eq!(PresetTable::new(presets), Err(PresetError::MissingDefault));

        let mut presets = factory_presets();
        presets[3].id = 4;
        assert_eq!(PresetTable::new(presets), Err(PresetError::DuplicateId(4)));
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut glass = factory_presets()[14].clone();
        glass.id = 20;
        glass.name = Cow::Borrowed("Glass Pad");
        let mut organ = factory_presets()[4].clone();
        organ.reverb_mix = 0.9;

        let table = PresetTable::factory()
            .with_overrides([glass, organ])
            .expect("valid overrides");
        assert_eq!(table.len(), 21);
        assert_eq!(table.get(20).name, "Glass Pad");
        assert_eq!(table.get(4).reverb_mix, 0.9);
    }

    #[test]
    fn category_names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_name(" PIANO "), Some(Category::Piano));
        assert_eq!(Category::from_name("kazoo"), None);
    }
}
