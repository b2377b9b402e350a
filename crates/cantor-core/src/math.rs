//! Pitch and level conversions.
//!
//! - [`cents_to_ratio`] - detune in cents to frequency ratio
//! - [`midi_to_freq`] / [`freq_to_midi`] - equal temperament, A4 = 440 Hz
//! - [`note_name_to_midi`] / [`note_name_to_freq`] - parse `"C#4"`, `"Bb-1"`, `"F♯3"`
//! - [`db_to_linear`] / [`linear_to_db`] - gain conversions

use libm::{expf, log2f, logf, powf};

/// Convert cents to a frequency ratio. 1200 cents = one octave.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Frequency in Hz of a (possibly fractional) MIDI note number.
///
/// ```rust
/// use cantor_core::midi_to_freq;
///
/// assert!((midi_to_freq(69.0) - 440.0).abs() < 1e-3);
/// assert!((midi_to_freq(60.0) - 261.626).abs() < 1e-2);
/// ```
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Fractional MIDI note number of a frequency in Hz.
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * log2f(freq / 440.0)
}

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels, flooring at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Parse a scientific pitch name into a MIDI note number.
///
/// Accepts a letter `A`-`G` (either case), any number of `#`/`♯` or
/// `b`/`♭` accidentals, and a signed octave. Middle C is `C4` = 60.
///
/// ```rust
/// use cantor_core::note_name_to_midi;
///
/// assert_eq!(note_name_to_midi("A4"), Some(69));
/// assert_eq!(note_name_to_midi("c#4"), Some(61));
/// assert_eq!(note_name_to_midi("Bb3"), Some(58));
/// assert_eq!(note_name_to_midi("C-1"), Some(0));
/// assert_eq!(note_name_to_midi("H2"), None);
/// ```
pub fn note_name_to_midi(name: &str) -> Option<i32> {
    let name = name.trim();
    let mut chars = name.chars();
    let pitch_class = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut rest = chars.as_str();
    let mut accidental = 0;
    loop {
        let mut it = rest.chars();
        match it.next() {
            Some('#' | '♯') => accidental += 1,
            Some('b' | '♭') => accidental -= 1,
            _ => break,
        }
        rest = it.as_str();
    }

    let octave: i32 = rest.parse().ok()?;
    Some((octave + 1) * 12 + pitch_class + accidental)
}

/// Parse a pitch name straight to Hz. See [`note_name_to_midi`].
pub fn note_name_to_freq(name: &str) -> Option<f32> {
    note_name_to_midi(name).map(|n| midi_to_freq(n as f32))
}
