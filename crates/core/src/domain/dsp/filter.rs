//! Recursive filter primitives
//!
//! `OnePole` is the workhorse of the tone stages: a single-coefficient
//! low-pass whose complement (`input - lowpass`) gives a high-pass for free.
//! `BiquadFilter` backs the per-band equalizer mode.

use std::f32::consts::PI;

/// One-pole low-pass state: `y += alpha * (x - y)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnePole {
    state: f32,
}

impl OnePole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the filter and return the low-passed sample
    #[inline]
    pub fn lowpass(&mut self, input: f32, alpha: f32) -> f32 {
        self.state += alpha * (input - self.state);
        self.state
    }

    /// Advance the filter and return the high-passed remainder
    #[inline]
    pub fn highpass(&mut self, input: f32, alpha: f32) -> f32 {
        input - self.lowpass(input, alpha)
    }

    pub fn value(&self) -> f32 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

// ============================================================================
// BIQUAD FILTER
// ============================================================================

/// Biquad filter coefficients
///
/// Direct Form I with a0 normalized to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Peaking EQ coefficients (RBJ cookbook)
    ///
    /// Boosts or cuts around `freq`; `gain_db` is clamped to +/- 12 dB.
    /// The centre frequency is kept below Nyquist so high bands stay stable
    /// at low sample rates.
    #[must_use]
    pub fn peaking(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let gain_db = gain_db.clamp(-12.0, 12.0);
        let freq = freq.min(sample_rate * 0.45);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Stateful biquad filter using Direct Form I
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Default for BiquadFilter {
    fn default() -> Self {
        Self::new(BiquadCoeffs::default())
    }
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Update coefficients without touching the state
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
