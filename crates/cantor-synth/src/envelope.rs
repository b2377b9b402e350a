//! Envelope scheduling against the audio clock.
//!
//! Envelopes are not stepped per sample. At note-on the whole attack and
//! decay are written into the voice's gain [`AutomationParam`] as absolute
//! times; at note-off the pending schedule is cancelled at the current value
//! and a release ramp is appended. Rendering only evaluates the timeline, so
//! timing is sample-accurate no matter when the caller scheduled it.
//!
//! ```text
//!  gain
//!  1.1·m ┤   ╱╲
//!        │  ╱  ╲__
//!  s·m   ┤ ╱      ‾‾‾‾‾‾‾‾‾‾╲
//!        │╱                  ╲__
//!  0     ┼──────────────────────‾‾──▶ t
//!        now  +a   +a+d     stop  +r  +r+grace
//! ```

use cantor_core::AutomationParam;

use crate::preset::{Adsr, FilterSettings};

/// Attack peak relative to master volume.
pub const ATTACK_OVERSHOOT: f32 = 1.1;

/// Lowest sustain target; exponential ramps cannot reach zero.
pub const SUSTAIN_FLOOR: f32 = 0.001;

/// Level the release ramp ends at.
pub const RELEASE_FLOOR: f32 = 0.0001;

/// Time after the release ramp ends before a voice's nodes are torn down.
pub const TEARDOWN_GRACE: f64 = 0.1;

/// Release time used when a voice is stolen to make room for a new note.
pub const STEAL_RELEASE: f32 = 0.015;

/// Lowest cutoff a filter sweep may target, in Hz.
const SWEEP_FLOOR_HZ: f32 = 20.0;

/// Lifecycle phase of a voice at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoicePhase {
    /// Not yet started.
    #[default]
    Idle,
    /// Ramping up to the attack peak.
    Attack,
    /// Falling from the peak toward the sustain level.
    Decay,
    /// Holding the sustain level.
    Sustain,
    /// Fading out after note-off.
    Release,
    /// Nodes stopped; the voice produces nothing.
    Destroyed,
}

impl VoicePhase {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Attack => "attack",
            Self::Decay => "decay",
            Self::Sustain => "sustain",
            Self::Release => "release",
            Self::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for VoicePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Program attack and decay into `gain`, starting at `now`.
///
/// Zero at `now`, linear to `master_volume * 1.1` over the attack, then
/// exponential to `max(sustain * master_volume, 0.001)` over the decay.
pub fn schedule_attack(gain: &mut AutomationParam, envelope: &Adsr, master_volume: f32, now: f64) {
    let peak_at = now + f64::from(envelope.attack.max(0.0));
    let sustain_at = peak_at + f64::from(envelope.decay.max(0.0));
    let sustain = (envelope.sustain * master_volume).max(SUSTAIN_FLOOR);

    gain.set_value_at_time(0.0, now)
        .linear_ramp_to_value_at_time(master_volume * ATTACK_OVERSHOOT, peak_at)
        .exponential_ramp_to_value_at_time(sustain, sustain_at);
}

/// Cancel pending automation at `now` and fade to silence over `release`.
///
/// The ramp starts from the value the gain has at `now`, wherever the attack
/// or decay had got to. Returns the time the voice may be torn down.
pub fn schedule_release(gain: &mut AutomationParam, release: f32, now: f64) -> f64 {
    let end = now + f64::from(release.max(0.0));
    gain.cancel_and_hold_at_time(now);
    gain.exponential_ramp_to_value_at_time(RELEASE_FLOOR, end);
    end + TEARDOWN_GRACE
}

/// Program the filter-envelope sweep into `cutoff`.
///
/// Sets the base cutoff at `now`; when the preset has a sweep amount, rises
/// linearly to `base + amount` by the end of the attack and falls back to the
/// base by the end of the decay.
pub fn schedule_filter_sweep(
    cutoff: &mut AutomationParam,
    filter: &FilterSettings,
    envelope: &Adsr,
    now: f64,
) {
    cutoff.set_value_at_time(filter.cutoff, now);
    if filter.envelope_amount == 0.0 {
        return;
    }
    let peak_at = now + f64::from(envelope.attack.max(0.0));
    let base_at = peak_at + f64::from(envelope.decay.max(0.0));
    let peak = (filter.cutoff + filter.envelope_amount).max(SWEEP_FLOOR_HZ);
    cutoff
        .linear_ramp_to_value_at_time(peak, peak_at)
        .exponential_ramp_to_value_at_time(filter.cutoff.max(SWEEP_FLOOR_HZ), base_at);
}

/// Phase of a voice started at `started_at` (and released at `released_at`)
/// as seen at `now`.
pub fn phase_at(
    envelope: &Adsr,
    started_at: f64,
    released_at: Option<f64>,
    now: f64,
) -> VoicePhase {
    if let Some(released) = released_at
        && now >= released
    {
        return VoicePhase::Release;
    }
    let attack_end = started_at + f64::from(envelope.attack.max(0.0));
    let decay_end = attack_end + f64::from(envelope.decay.max(0.0));
    if now < started_at {
        VoicePhase::Idle
    } else if now < attack_end {
        VoicePhase::Attack
    } else if now < decay_end {
        VoicePhase::Decay
    } else {
        VoicePhase::Sustain
    }
}
