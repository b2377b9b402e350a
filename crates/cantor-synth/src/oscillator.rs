//! Band-limited audio oscillator.
//!
//! Sine is generated directly. Sawtooth and square use 4th-order PolyBLEP
//! corrections at their discontinuities; triangle is a leaky integration of
//! the corrected square, which keeps its slope discontinuities smooth.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

use crate::preset::Waveform;

/// Phase-accumulating oscillator producing values in roughly `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use cantor_synth::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(48000.0, Waveform::Sawtooth);
/// osc.set_frequency(220.0);
/// let sample = osc.advance();
/// assert!(sample.abs() <= 1.1);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: Waveform,
    /// Triangle integrator state.
    integrator: f32,
}

impl Oscillator {
    /// Create an oscillator at 440 Hz.
    pub fn new(sample_rate: f32, waveform: Waveform) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform,
            integrator: 0.0,
        }
    }

    /// Set frequency in Hz. Negative values are treated as zero.
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.max(0.0);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current phase in cycles.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase and integrator state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.integrator = 0.0;
    }

    /// Produce one sample and advance the phase.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let phase = self.phase;
        let dt = self.phase_inc.max(1e-9);
        let output = match self.waveform {
            Waveform::Sine => sinf(phase * TAU),
            Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Waveform::Square => square(phase, dt),
            Waveform::Triangle => {
                // Leak scales with frequency so DC never accumulates
                let leak = 1.0 - self.phase_inc.min(0.1);
                self.integrator = leak * self.integrator + square(phase, dt) * dt * 4.0;
                self.integrator
            }
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= floorf(self.phase);
        }
        output
    }
}

#[inline]
fn square(phase: f32, dt: f32) -> f32 {
    let naive = if phase < 0.5 { 1.0 } else { -1.0 };
    let falling = phase + 0.5;
    let falling = falling - floorf(falling);
    naive + poly_blep(phase, dt) - poly_blep(falling, dt)
}

/// 4th-order PolyBLEP residual, two samples either side of a discontinuity.
///
/// `t` is the phase in `[0, 1)` relative to the discontinuity and `dt` the
/// phase increment per sample.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    #[inline]
    fn residual(n: f32) -> f32 {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    }

    let window = 2.0 * dt;
    if t < window {
        residual(t / dt)
    } else if t > 1.0 - window {
        -residual((1.0 - t) / dt)
    } else {
        0.0
    }
}
