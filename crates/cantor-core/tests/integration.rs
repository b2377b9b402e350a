//! Integration tests for cantor-core.
//!
//! Exercises the primitives the way the synth engine drives them: automation
//! evaluated against a running context clock, filter cutoff swept per render
//! quantum, and a decaying impulse pushed through the convolver.

use cantor_core::{
    AudioContext, AutomationParam, Biquad, FilterType, Lfo, RENDER_QUANTUM, StereoConvolver,
    cents_to_ratio,
};

const SAMPLE_RATE: f32 = 48000.0;
const TAU: f32 = core::f32::consts::TAU;

fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

// ============================================================================
// 1. Automation against the clock
// ============================================================================

#[test]
fn envelope_shape_tracks_context_time() {
    let mut ctx = AudioContext::new(SAMPLE_RATE);
    ctx.resume();

    let now = ctx.current_time();
    let mut gain = AutomationParam::new(0.0);
    gain.set_value_at_time(0.0, now)
        .linear_ramp_to_value_at_time(1.1, now + 0.01)
        .exponential_ramp_to_value_at_time(0.3, now + 0.11);

    let mut block = [0.0f32; RENDER_QUANTUM];
    let mut peak = 0.0f32;
    let mut peak_time = 0.0;
    while ctx.current_time() < 0.2 {
        gain.fill(ctx.current_time(), ctx.sample_period(), &mut block);
        for (i, &v) in block.iter().enumerate() {
            if v > peak {
                peak = v;
                peak_time = ctx.frame_time(i);
            }
        }
        ctx.advance(RENDER_QUANTUM);
    }

    assert!((peak - 1.1).abs() < 1e-3);
    assert!((peak_time - 0.01).abs() < 1.0 / f64::from(SAMPLE_RATE) + 1e-9);
    assert!((gain.value_at(ctx.current_time()) - 0.3).abs() < 1e-6);
}

#[test]
fn release_after_hold_decays_from_current_level() {
    let mut gain = AutomationParam::new(0.0);
    gain.set_value_at_time(0.0, 0.0)
        .linear_ramp_to_value_at_time(1.0, 1.0);

    // Release half way through the attack
    let held = gain.cancel_and_hold_at_time(0.5);
    gain.exponential_ramp_to_value_at_time(0.0001, 1.5);

    assert!((held - 0.5).abs() < 1e-6);
    assert!(gain.value_at(0.75) < 0.5);
    assert!(gain.value_at(0.75) > 0.0001);
    assert!((gain.value_at(1.5) - 0.0001).abs() < 1e-7);
    assert!(gain.value_at(0.6) > gain.value_at(0.9));
}

// ============================================================================
// 2. Filter sweeps
// ============================================================================

#[test]
fn swept_lowpass_opens_over_time() {
    let mut cutoff = AutomationParam::new(200.0);
    cutoff
        .set_value_at_time(200.0, 0.0)
        .linear_ramp_to_value_at_time(8000.0, 0.2);

    let mut filter = Biquad::new();
    let total = (SAMPLE_RATE * 0.3) as usize;
    let mut out = vec![0.0f32; total];
    for quantum in 0..total / RENDER_QUANTUM {
        let start = quantum * RENDER_QUANTUM;
        let t = f64::from(start as f32 / SAMPLE_RATE);
        filter.configure(FilterType::Lowpass, cutoff.value_at(t), 1.0, SAMPLE_RATE);
        for i in start..start + RENDER_QUANTUM {
            let x = libm::sinf(TAU * 3000.0 * i as f32 / SAMPLE_RATE);
            out[i] = filter.process(x);
        }
    }

    let early = rms(&out[960..1920]);
    let late = rms(&out[11520..13440]);
    assert!(late > early * 3.0, "early={early} late={late}");
}

#[test]
fn vibrato_ratio_bounds() {
    let mut lfo = Lfo::new(SAMPLE_RATE, 5.0);
    let depth_cents = 15.0;
    for _ in 0..(SAMPLE_RATE as usize) {
        let ratio = cents_to_ratio(lfo.next() * depth_cents);
        assert!(ratio >= cents_to_ratio(-depth_cents) - 1e-6);
        assert!(ratio <= cents_to_ratio(depth_cents) + 1e-6);
    }
}

// ============================================================================
// 3. Convolution
// ============================================================================

#[test]
fn convolver_spreads_energy_over_impulse_length() {
    let sr = 8000usize;
    let ir: Vec<f32> = (0..sr / 2)
        .map(|i| {
            let sign = if i % 2 == 0 { 0.3 } else { -0.3 };
            libm::expf(-6.0 * i as f32 / (sr / 2) as f32) * sign
        })
        .collect();
    let mut conv = StereoConvolver::new(&ir, &ir, RENDER_QUANTUM);

    let mut input = vec![0.0f32; RENDER_QUANTUM];
    input[0] = 1.0;
    let mut l = vec![0.0f32; RENDER_QUANTUM];
    let mut r = vec![0.0f32; RENDER_QUANTUM];

    let mut energy_per_block = Vec::new();
    conv.process_block(&input, &mut l, &mut r);
    energy_per_block.push(rms(&l));
    input[0] = 0.0;
    for _ in 0..40 {
        conv.process_block(&input, &mut l, &mut r);
        energy_per_block.push(rms(&l));
    }

    assert!(energy_per_block[0] > energy_per_block[20]);
    assert!(energy_per_block[20] > 0.0);
    assert!(conv.is_idle());
    assert_eq!(*energy_per_block.last().unwrap_or(&1.0), 0.0);
}
