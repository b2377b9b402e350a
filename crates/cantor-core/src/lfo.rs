//! Sine low-frequency oscillator for vibrato, tremolo and chorus.

use core::f32::consts::TAU;
use libm::sinf;

/// Phase-accumulating sine LFO producing values in `[-1.0, 1.0]`.
///
/// # Example
///
/// ```rust
/// use cantor_core::Lfo;
///
/// let mut lfo = Lfo::new(1000.0, 250.0);
/// lfo.set_phase(0.25);
/// assert!((lfo.next() - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create an LFO at `freq_hz`, starting at phase 0.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
        }
    }

    /// Set the rate in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Rate in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Jump to `phase` in cycles, wrapped into `[0, 1)`.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Current phase in cycles.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Next value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let output = sinf(self.phase * TAU);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        output
    }

    /// Skip `frames` samples without producing output.
    pub fn advance(&mut self, frames: usize) {
        self.phase = (self.phase + self.phase_inc * frames as f32).rem_euclid(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let mut lfo = Lfo::new(48000.0, 5.0);
        for _ in 0..48000 {
            let v = lfo.next();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn completes_one_cycle_per_period() {
        let mut lfo = Lfo::new(1000.0, 10.0);
        for _ in 0..100 {
            lfo.next();
        }
        assert!(lfo.phase() < 1e-3 || lfo.phase() > 1.0 - 1e-3);
    }

    #[test]
    fn set_phase_wraps() {
        let mut lfo = Lfo::default();
        lfo.set_phase(1.25);
        assert!((lfo.phase() - 0.25).abs() < 1e-6);
        lfo.set_phase(-0.25);
        assert!((lfo.phase() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn advance_matches_next() {
        let mut a = Lfo::new(48000.0, 3.0);
        let mut b = a.clone();
        for _ in 0..777 {
            a.next();
        }
        b.advance(777);
        assert!((a.phase() - b.phase()).abs() < 1e-4);
    }
}
