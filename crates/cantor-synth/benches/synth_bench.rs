//! Criterion benchmarks for cantor-synth components
//!
//! Run with: cargo bench -p cantor-synth
#![allow(missing_docs)]

use std::time::Duration;

use cantor_synth::{
    HallImpulse, ImpulseGenerator, Oscillator, PresetTable, Synth, SynthOptions, VoiceBuilder,
    VoiceRequest, Waveform,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];
const CHORD: &[(&str, f32)] = &[
    ("C4", 261.63),
    ("E4", 329.63),
    ("G4", 392.0),
    ("B4", 493.88),
    ("D5", 587.33),
    ("F5", 698.46),
    ("A5", 880.0),
    ("C6", 1046.5),
];

// ============================================================================
// Oscillator benchmarks
// ============================================================================

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    for waveform in Waveform::ALL {
        for &block_size in BLOCK_SIZES {
            let mut osc = Oscillator::new(SAMPLE_RATE, waveform);
            osc.set_frequency(440.0);

            group.bench_with_input(
                BenchmarkId::new(waveform.as_str(), block_size),
                &block_size,
                |b, &size| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for _ in 0..size {
                            sum += osc.advance();
                        }
                        black_box(sum)
                    })
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Voice benchmarks
// ============================================================================

fn bench_voice_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoiceBuild");
    let table = PresetTable::factory();
    let builder = VoiceBuilder::new(SAMPLE_RATE);
    let mut rng = StdRng::seed_from_u64(1);

    for id in [0u32, 6, 14] {
        let preset = table.get(id);
        group.bench_function(preset.name.as_ref(), |b| {
            b.iter(|| {
                black_box(builder.build(
                    VoiceRequest {
                        key: "C4",
                        generation: 1,
                        preset,
                        frequency: 261.63,
                        master_volume: 0.5,
                        now: 0.0,
                        reverb_ready: true,
                    },
                    &mut rng,
                ))
            })
        });
    }

    group.finish();
}

fn bench_voice_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("VoiceRender");
    let table = PresetTable::factory();
    let builder = VoiceBuilder::new(SAMPLE_RATE);
    let mut rng = StdRng::seed_from_u64(1);
    let period = 1.0 / f64::from(SAMPLE_RATE);

    for id in [0u32, 4, 6, 14, 18] {
        let preset = table.get(id);
        let mut voice = builder.build(
            VoiceRequest {
                key: "C4",
                generation: 1,
                preset,
                frequency: 261.63,
                master_volume: 0.5,
                now: 0.0,
                reverb_ready: true,
            },
            &mut rng,
        );
        let mut dry = vec![0.0f32; 128];
        let mut wet = vec![0.0f32; 128];
        let mut t = 0.0;

        group.bench_function(preset.name.as_ref(), |b| {
            b.iter(|| {
                voice.render(t, period, &mut dry, &mut wet);
                t += 128.0 * period;
                black_box(dry[0])
            })
        });
    }

    group.finish();
}

// ============================================================================
// Synth benchmarks
// ============================================================================

fn bench_synth_voice_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Synth_VoiceScaling");

    for voices in [1usize, 4, 8] {
        let mut synth = Synth::new(SynthOptions {
            sample_rate: SAMPLE_RATE,
            reverb: false,
            seed: Some(1),
            ..SynthOptions::default()
        });
        for &(key, freq) in &CHORD[..voices] {
            synth.play_note(key, freq);
        }
        let mut left = vec![0.0f32; 512];
        let mut right = vec![0.0f32; 512];

        group.bench_with_input(BenchmarkId::from_parameter(voices), &voices, |b, _| {
            b.iter(|| {
                synth.render(&mut left, &mut right);
                black_box(left[0])
            })
        });
    }

    group.finish();
}

fn bench_synth_with_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("Synth_Reverb");

    let mut synth = Synth::new(SynthOptions {
        sample_rate: SAMPLE_RATE,
        seed: Some(1),
        ..SynthOptions::default()
    });
    synth.wait_for_reverb(Duration::from_secs(60));
    synth.set_instrument(5);
    for &(key, freq) in &CHORD[..4] {
        synth.play_note(key, freq);
    }
    let mut left = vec![0.0f32; 512];
    let mut right = vec![0.0f32; 512];

    group.bench_function("4_voices_512", |b| {
        b.iter(|| {
            synth.render(&mut left, &mut right);
            black_box(left[0])
        })
    });

    group.finish();
}

fn bench_hall_impulse(c: &mut Criterion) {
    let mut group = c.benchmark_group("HallImpulse");
    group.sample_size(10);

    let hall = HallImpulse::with_seed(1);
    group.bench_function("generate_48k", |b| {
        b.iter(|| black_box(hall.generate(SAMPLE_RATE)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator_waveforms,
    bench_voice_build,
    bench_voice_render,
    bench_synth_voice_scaling,
    bench_synth_with_reverb,
    bench_hall_impulse,
);

criterion_main!(benches);
