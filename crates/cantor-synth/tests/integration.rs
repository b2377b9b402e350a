//! Integration tests for cantor-synth.
//!
//! Drives the [`Synth`] facade the way a host does: notes in, buffers out,
//! with the context clock as the only notion of time.

use std::borrow::Cow;
use std::time::Duration;

use cantor_core::RENDER_QUANTUM;
use cantor_synth::{
    Adsr, HallImpulse, ImpulseGenerator, ImpulseResponse, PresetTable, ReverbError, Synth,
    SynthOptions, ToneRole, VoicePhase, envelope,
};

/// 0.05 s is exactly five render quanta at this rate.
const SAMPLE_RATE: f32 = 12800.0;

fn options() -> SynthOptions {
    SynthOptions {
        sample_rate: SAMPLE_RATE,
        master_volume: 1.0,
        reverb: false,
        seed: Some(11),
        ..SynthOptions::default()
    }
}

/// Render whole quanta until the clock reaches `until`; returns the peak.
fn render_until(synth: &mut Synth, until: f64) -> f32 {
    let mut l = [0.0f32; RENDER_QUANTUM];
    let mut r = [0.0f32; RENDER_QUANTUM];
    let mut peak = 0.0f32;
    while synth.current_time() < until - 1e-9 {
        synth.render(&mut l, &mut r);
        peak = l.iter().chain(&r).fold(peak, |p, s| p.max(s.abs()));
    }
    peak
}

struct Broken;

impl ImpulseGenerator for Broken {
    fn generate(&self, _sample_rate: f32) -> Result<ImpulseResponse, ReverbError> {
        Err(ReverbError::Allocation { frames: usize::MAX })
    }
}

// ============================================================================
// 1. Play / stop idempotence
// ============================================================================

#[test]
fn repeated_play_keeps_one_voice() {
    let mut synth = Synth::new(options());
    synth.play_note("C4", 261.63);
    assert_eq!(synth.active_note_count(), 1);
    synth.play_note("C4", 261.63);
    assert_eq!(synth.active_note_count(), 1);
    assert_eq!(synth.voice("C4").map(|v| v.generation()), Some(1));
}

#[test]
fn stop_of_unknown_key_changes_nothing() {
    let mut synth = Synth::new(options());
    synth.stop_note("C4");
    assert_eq!(synth.active_note_count(), 0);

    synth.play_note("E4", 329.63);
    synth.stop_note("C4");
    assert_eq!(synth.active_note_count(), 1);
    assert!(!synth.voice("E4").is_some_and(|v| v.is_released()));
}

// ============================================================================
// 2. Envelope
// ============================================================================

#[test]
fn envelope_shape_matches_schedule() {
    let mut pluck = PresetTable::factory().get(13).clone();
    pluck.id = 20;
    pluck.name = Cow::Borrowed("Test Pluck");
    pluck.envelope = Adsr {
        attack: 0.01,
        decay: 0.1,
        sustain: 0.5,
        release: 0.3,
    };
    let table = PresetTable::factory()
        .with_overrides([pluck])
        .expect("valid table");

    let mut synth = Synth::with_presets(options(), table);
    synth.set_instrument(20);
    synth.play_note("A4", 440.0);
    let voice = synth.voice("A4").expect("voice");

    assert_eq!(voice.gain_at(0.0), 0.0);
    assert!((voice.gain_at(0.01) - 1.1).abs() < 1e-4);
    assert!((voice.gain_at(0.11) - 0.5).abs() < 1e-4);
    let mut t = 0.01;
    while t <= 0.11 {
        assert!(voice.gain_at(t) >= envelope::SUSTAIN_FLOOR);
        t += 0.0005;
    }
}

#[test]
fn release_mid_decay_is_continuous() {
    let mut synth = Synth::new(options());
    synth.play_note("C4", 261.63);
    render_until(&mut synth, 0.3);

    let at = synth.current_time();
    let before = synth.voice("C4").expect("voice").gain_at(at);
    synth.stop_note("C4");
    let voice = synth.voice("C4").expect("still releasing");

    assert!((voice.gain_at(at) - before).abs() < 1e-5);
    assert!(voice.gain_at(at + 0.001) <= before);
    assert_eq!(voice.phase_at(at), VoicePhase::Release);
}

// ============================================================================
// 3. Voice construction
// ============================================================================

#[test]
fn unknown_instrument_builds_default_graph() {
    let mut fallback = Synth::new(options());
    fallback.set_instrument(99999);
    fallback.play_note("C4", 261.63);

    let mut default = Synth::new(options());
    default.set_instrument(0);
    default.play_note("C4", 261.63);

    assert_eq!(fallback.current_instrument().id, 0);
    let a = fallback.voice("C4").expect("voice").graph();
    let b = default.voice("C4").expect("voice").graph();
    assert_eq!(a, b);
}

#[test]
fn piano_has_three_partials() {
    let mut synth = Synth::new(options());
    synth.play_note("A3", 220.0);
    let graph = synth.voice("A3").expect("voice").graph();

    let partials: Vec<_> = graph.harmonics().collect();
    assert_eq!(partials.len(), 3);
    for (node, (number, amp)) in partials.iter().zip([(2u32, 0.7f32), (3, 0.4), (4, 0.25)]) {
        assert_eq!(node.role, ToneRole::Harmonic { number });
        assert!((node.frequency - 220.0 * number as f32).abs() < 1e-3);
        assert!((node.gain - amp * 0.3).abs() < 1e-6);
    }
}

#[test]
fn graph_serializes_for_inspection() {
    let mut synth = Synth::new(options());
    synth.set_instrument(6);
    synth.play_note("G3", 196.0);
    let graph = synth.voice("G3").expect("voice").graph();
    let json = serde_json::to_value(&graph).expect("serialize");

    assert_eq!(json["preset_name"], "Strings");
    assert_eq!(json["oscillators"][0]["role"]["kind"], "primary");
    assert_eq!(json["oscillators"][0]["waveform"], "sawtooth");
    assert!(json["vibrato"].is_object());
    assert!(json.get("tremolo").is_none());
    assert_eq!(json["filter"]["filter_type"], "lowpass");
}

// ============================================================================
// 4. Reverb
// ============================================================================

#[test]
fn failed_impulse_leaves_voices_dry() {
    let mut synth = Synth::with_impulse_generator(
        SynthOptions {
            reverb: true,
            ..options()
        },
        PresetTable::factory(),
        Broken,
    );
    assert!(!synth.wait_for_reverb(Duration::from_secs(30)));
    assert!(!synth.reverb_pending());

    // Church organ has a 0.5 reverb mix
    synth.set_instrument(5);
    synth.play_note("C3", 130.81);
    let voice = synth.voice("C3").expect("voice");
    assert!(voice.preset().uses_reverb());
    assert!(voice.reverb_send().is_none());
    assert!(voice.graph().reverb.is_none());

    let peak = render_until(&mut synth, 0.2);
    assert!(peak > 0.0 && peak.is_finite());
}

#[test]
fn ready_reverb_splits_and_widens() {
    let mut synth = Synth::with_impulse_generator(
        SynthOptions {
            reverb: true,
            ..options()
        },
        PresetTable::factory(),
        HallImpulse::with_seed(5),
    );
    assert!(synth.wait_for_reverb(Duration::from_secs(30)));

    synth.set_instrument(5);
    synth.play_note("C3", 130.81);
    let send = synth
        .voice("C3")
        .and_then(|v| v.reverb_send())
        .expect("wet voice");
    assert!((send.dry - 0.5).abs() < 1e-6);
    assert!((send.wet - 0.5).abs() < 1e-6);

    render_until(&mut synth, 0.25);
    let mut l = [0.0f32; RENDER_QUANTUM];
    let mut r = [0.0f32; RENDER_QUANTUM];
    synth.render(&mut l, &mut r);
    assert!(l.iter().zip(&r).any(|(a, b)| (a - b).abs() > 1e-6));
}

// ============================================================================
// 5. Lifecycle and teardown
// ============================================================================

#[test]
fn teardown_within_release_window() {
    let mut synth = Synth::new(options());
    synth.set_instrument(13); // release 0.2
    synth.play_note("A4", 440.0);
    render_until(&mut synth, 0.1);

    let stop = synth.current_time();
    synth.stop_note("A4");
    let release = 0.2;

    render_until(&mut synth, stop + release);
    assert!(synth.voice("A4").is_some(), "alive for the whole release");
    assert_eq!(synth.active_note_count(), 1);

    render_until(&mut synth, stop + release + 0.2);
    assert!(synth.voice("A4").is_none());
    assert_eq!(synth.voices().count(), 0);
    assert_eq!(synth.active_note_count(), 0);
    assert_eq!(render_until(&mut synth, stop + release + 0.3), 0.0);
}

#[test]
fn acoustic_piano_scenario() {
    let mut synth = Synth::new(options());
    synth.play_note("C4", 261.63);
    assert_eq!(synth.active_note_count(), 1);

    render_until(&mut synth, 0.05);
    let stop = synth.current_time();
    assert!((stop - 0.05).abs() < 1e-9);

    {
        let voice = synth.voice("C4").expect("voice");
        let g = voice.gain_at(0.05);
        assert!(g < 1.1 && g > 0.2, "mid-decay gain {g}");
        assert!(voice.gain_at(0.04) > g && g > voice.gain_at(0.06));
        assert_eq!(voice.phase_at(0.05), VoicePhase::Decay);
    }

    let held = synth.voice("C4").expect("voice").gain_at(stop);
    synth.stop_note("C4");
    {
        let voice = synth.voice("C4").expect("releasing");
        assert!((voice.gain_at(stop) - held).abs() < 1e-5);
        let end = voice.gain_at(stop + 1.2);
        assert!((end - envelope::RELEASE_FLOOR).abs() < 1e-6);
        assert!(voice.gain_at(stop + 0.6) < held);
    }

    render_until(&mut synth, stop + 1.2);
    assert_eq!(synth.active_note_count(), 1);
    render_until(&mut synth, stop + 1.4);
    assert_eq!(synth.active_note_count(), 0);
}

#[test]
fn retrigger_during_release_survives_old_teardown() {
    let mut synth = Synth::new(options());
    synth.set_instrument(13);
    synth.play_note("A4", 440.0);
    render_until(&mut synth, 0.1);
    synth.stop_note("A4");
    render_until(&mut synth, 0.15);

    synth.play_note("A4", 440.0);
    assert_eq!(synth.active_note_count(), 2);
    assert_eq!(synth.voice("A4").map(|v| v.generation()), Some(2));

    // Old voice is due at 0.1 + 0.2 + 0.1
    render_until(&mut synth, 0.5);
    assert_eq!(synth.active_note_count(), 1);
    let voice = synth.voice("A4").expect("new voice survives");
    assert_eq!(voice.generation(), 2);
    assert!(!voice.is_released());
}

#[test]
fn polyphony_limit_steals_oldest() {
    let mut synth = Synth::new(SynthOptions {
        polyphony: Some(2),
        ..options()
    });
    synth.play_note("C4", 261.63);
    synth.play_note("E4", 329.63);
    synth.play_note("G4", 392.0);
    assert_eq!(synth.active_note_count(), 3);
    assert!(synth.voice("C4").is_some_and(|v| v.is_released()));

    render_until(&mut synth, f64::from(envelope::STEAL_RELEASE) + envelope::TEARDOWN_GRACE + 0.02);
    assert_eq!(synth.active_note_count(), 2);
    assert!(synth.voice("C4").is_none());
}

#[test]
fn stop_all_releases_everything() {
    let mut synth = Synth::new(SynthOptions {
        polyphony: None,
        ..options()
    });
    synth.set_instrument(13);
    for (key, f) in [("C4", 261.63), ("E4", 329.63), ("G4", 392.0), ("C5", 523.25)] {
        synth.play_note(key, f);
    }
    render_until(&mut synth, 0.1);
    synth.stop_all_notes();
    assert!(synth.voices().all(|(_, v)| v.is_released()));
    render_until(&mut synth, 0.5);
    assert_eq!(synth.active_note_count(), 0);
}

#[test]
fn volume_scales_future_notes_only() {
    let mut synth = Synth::new(options());
    synth.set_instrument(13);
    synth.set_volume(0.5);
    synth.play_note("A4", 440.0);
    synth.set_volume(1.0);
    synth.play_note("B4", 493.88);

    let quiet = synth.voice("A4").expect("voice").gain_at(10.0);
    let loud = synth.voice("B4").expect("voice").gain_at(10.0);
    assert!((quiet - 0.35).abs() < 1e-5);
    assert!((loud - 0.7).abs() < 1e-5);
}

#[test]
fn tremolo_follows_master_volume() {
    let mut synth = Synth::new(options());
    synth.set_instrument(4); // organ, tremolo 6 Hz
    synth.set_volume(0.0);
    synth.play_note("A3", 220.0);

    // Attack and decay hold zero; afterwards only the sustain floor remains
    assert_eq!(render_until(&mut synth, 0.1), 0.0);
    let floor = render_until(&mut synth, 0.5);
    assert!(floor < 5e-3, "peak {floor} at volume 0");
}

#[test]
fn tremolo_tail_fades_before_teardown() {
    let mut synth = Synth::new(options());
    synth.set_instrument(4); // release 0.1
    synth.play_note("A3", 220.0);
    let held = render_until(&mut synth, 0.5);
    assert!(held > 0.3, "held peak {held}");

    let stop = synth.current_time();
    synth.stop_note("A3");
    render_until(&mut synth, stop + 0.1);

    let tail = render_until(&mut synth, stop + 0.19);
    assert_eq!(synth.active_note_count(), 1, "still inside the grace period");
    assert!(tail < 1e-3, "tail {tail} after release");
}

#[test]
fn seeded_synths_render_identically() {
    let run = || {
        let mut synth = Synth::new(options());
        synth.set_instrument(14); // pad with chorus and tremolo
        synth.play_note("C4", 261.63);
        synth.play_note("G4", 392.0);
        let mut l = vec![0.0; 4096];
        let mut r = vec![0.0; 4096];
        synth.render(&mut l, &mut r);
        let chorus = synth
            .voice("C4")
            .and_then(|v| v.graph().chorus)
            .expect("chorus");
        (l, chorus)
    };
    let (a, chorus_a) = run();
    let (b, chorus_b) = run();
    assert_eq!(a, b);
    assert_eq!(chorus_a, chorus_b);
}
