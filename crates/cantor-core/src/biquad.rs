//! Second-order IIR filter for per-voice tone shaping.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook. Each voice owns one
//! [`Biquad`] and calls [`Biquad::configure`] whenever its cutoff automation
//! moves, so coefficient updates are cheap and stateless.

use core::f32::consts::PI;
use libm::{cosf, sinf};

/// Filter response shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FilterType {
    /// Attenuates above the cutoff.
    #[default]
    Lowpass,
    /// Attenuates below the cutoff.
    Highpass,
    /// Passes a band around the center frequency (0 dB peak).
    Bandpass,
    /// Rejects a band around the center frequency.
    Notch,
    /// Flat magnitude, frequency-dependent phase.
    Allpass,
}

impl FilterType {
    /// Every filter type, in declaration order.
    pub const ALL: [FilterType; 5] = [
        FilterType::Lowpass,
        FilterType::Highpass,
        FilterType::Bandpass,
        FilterType::Notch,
        FilterType::Allpass,
    ];

    /// Lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Notch => "notch",
            Self::Allpass => "allpass",
        }
    }

    /// Cookbook coefficients `(b0, b1, b2, a0, a1, a2)` for this shape.
    pub fn coefficients(
        self,
        frequency: f32,
        q: f32,
        sample_rate: f32,
    ) -> (f32, f32, f32, f32, f32, f32) {
        match self {
            Self::Lowpass => lowpass_coefficients(frequency, q, sample_rate),
            Self::Highpass => highpass_coefficients(frequency, q, sample_rate),
            Self::Bandpass => bandpass_coefficients(frequency, q, sample_rate),
            Self::Notch => notch_coefficients(frequency, q, sample_rate),
            Self::Allpass => allpass_coefficients(frequency, q, sample_rate),
        }
    }
}

impl core::fmt::Display for FilterType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direct Form I biquad.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
///
/// # Example
///
/// ```rust
/// use cantor_core::{Biquad, FilterType};
///
/// let mut filter = Biquad::new();
/// filter.configure(FilterType::Lowpass, 1000.0, 0.707, 48000.0);
///
/// let mut y = 0.0;
/// for _ in 0..4800 {
///     y = filter.process(1.0);
/// }
/// assert!((y - 1.0).abs() < 1e-3); // unity DC gain
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Passthrough filter (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Set raw coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Recompute coefficients for `filter_type` at `frequency`.
    ///
    /// The frequency is clamped to `(10 Hz, 0.49 * sample_rate)` and Q to a
    /// positive minimum so automation overshoot can never produce an
    /// unstable filter. Delay-line state is preserved.
    pub fn configure(&mut self, filter_type: FilterType, frequency: f32, q: f32, sample_rate: f32) {
        let nyquist_guard = sample_rate * 0.49;
        let frequency = frequency.clamp(10.0, nyquist_guard.max(10.0));
        let q = q.max(1e-3);
        let (b0, b1, b2, a0, a1, a2) = filter_type.coefficients(frequency, q, sample_rate);
        self.set_coefficients(b0, b1, b2, a0, a1, a2);
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clear the delay lines, keeping coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let alpha = sinf(omega) / (2.0 * q);
    (cos_omega, alpha)
}

/// Low-pass coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b1 = 1.0 - cos_omega;
    (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// High-pass coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn highpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b1 = -(1.0 + cos_omega);
    (-b1 / 2.0, b1, -b1 / 2.0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Band-pass coefficients with constant 0 dB peak gain.
pub fn bandpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// Notch coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn notch_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let a1 = -2.0 * cos_omega;
    (1.0, a1, 1.0, 1.0 + alpha, a1, 1.0 - alpha)
}

/// All-pass coefficients `(b0, b1, b2, a0, a1, a2)`.
pub fn allpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let a1 = -2.0 * cos_omega;
    (1.0 - alpha, a1, 1.0 + alpha, 1.0 + alpha, a1, 1.0 - alpha)
}
