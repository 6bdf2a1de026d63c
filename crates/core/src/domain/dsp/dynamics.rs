//! Dynamics and gain stages
//!
//! Leveler and compressor track signal level across blocks; limiter, master
//! volume and the hard clip are stateless per-sample transforms.

use super::{Stage, EFFECT_EPSILON};
use crate::domain::audio::{db_to_gain, ChannelLayout};
use crate::domain::params::EffectParameters;

// ============================================================================
// VOLUME LEVELER
// ============================================================================

/// RMS-driven automatic gain
///
/// Tracks block RMS with heavy exponential smoothing and blends toward the
/// gain that would bring it to [`VolumeLeveler::TARGET_RMS`]. The gain is
/// ramped across each block to avoid zipper noise.
#[derive(Debug, Clone)]
pub struct VolumeLeveler {
    smoothed_rms: f32,
    gain: f32,
}

impl Default for VolumeLeveler {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeLeveler {
    /// Target RMS (about -14 dBFS)
    pub const TARGET_RMS: f32 = 0.2;
    pub const MIN_GAIN: f32 = 0.1;
    pub const MAX_GAIN: f32 = 4.0;
    const SMOOTHING: f32 = 0.99;
    // Below this the signal is treated as silence and the gain is frozen
    const SILENCE_RMS: f32 = 1e-4;

    pub fn new() -> Self {
        Self {
            smoothed_rms: 0.0,
            gain: 1.0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn smoothed_rms(&self) -> f32 {
        self.smoothed_rms
    }
}

impl Stage for VolumeLeveler {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.volume_leveler() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let strength = params.volume_leveler();
        let rms = (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt();

        // The first measurement seeds the tracker instead of easing up from zero
        self.smoothed_rms = if self.smoothed_rms == 0.0 {
            rms
        } else {
            Self::SMOOTHING * self.smoothed_rms + (1.0 - Self::SMOOTHING) * rms
        };
        if self.smoothed_rms < Self::SILENCE_RMS {
            return;
        }

        let target = (Self::TARGET_RMS / self.smoothed_rms).clamp(Self::MIN_GAIN, Self::MAX_GAIN);
        let desired = 1.0 + (target - 1.0) * strength;

        let frames = buffer.len() / layout.count();
        let step = (desired - self.gain) / frames as f32;
        let mut gain = self.gain;
        for frame in buffer.chunks_exact_mut(layout.count()) {
            gain += step;
            frame.iter_mut().for_each(|s| *s *= gain);
        }
        self.gain = desired;
    }

    fn reset(&mut self) {
        self.smoothed_rms = 0.0;
        self.gain = 1.0;
    }

    fn name(&self) -> &str {
        "VolumeLeveler"
    }
}

// ============================================================================
// COMPRESSOR
// ============================================================================

/// Compressor settings derived from the single strength control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorCurve {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_sec: f32,
    pub release_sec: f32,
}

impl CompressorCurve {
    /// Map strength 0..1 onto threshold -10..-20 dB and ratio 1:1..8:1
    pub fn from_strength(strength: f32) -> Self {
        let strength = strength.clamp(0.0, 1.0);
        Self {
            threshold_db: -10.0 - 10.0 * strength,
            ratio: 1.0 + 7.0 * strength,
            attack_sec: 0.020 - 0.015 * strength,
            release_sec: 0.200 - 0.100 * strength,
        }
    }
}

/// Peak-detecting, channel-linked compressor
///
/// One envelope follows the loudest channel of each frame and the resulting
/// gain reduction is applied to every channel, preserving the stereo image.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            envelope: 0.0,
        }
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Linear gain for an envelope level: `(env / thr)^(1/ratio - 1)` above threshold
    #[inline]
    pub fn gain_for(envelope: f32, threshold: f32, ratio: f32) -> f32 {
        if envelope <= threshold {
            1.0
        } else {
            (envelope / threshold).powf(1.0 / ratio - 1.0)
        }
    }
}

impl Stage for Compressor {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.compressor_strength() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let curve = CompressorCurve::from_strength(params.compressor_strength());
        let threshold = db_to_gain(curve.threshold_db);
        let attack = (-1.0 / (curve.attack_sec * self.sample_rate)).exp();
        let release = (-1.0 / (curve.release_sec * self.sample_rate)).exp();

        for frame in buffer.chunks_exact_mut(layout.count()) {
            let peak = frame.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
            let coeff = if peak > self.envelope { attack } else { release };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * peak;

            let gain = Self::gain_for(self.envelope, threshold, curve.ratio);
            frame.iter_mut().for_each(|s| *s *= gain);
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn name(&self) -> &str {
        "Compressor"
    }
}

// ============================================================================
// LOUDNESS MAKEUP
// ============================================================================

/// Post-compression makeup gain, up to x2.5
#[derive(Debug, Clone, Default)]
pub struct LoudnessMakeup;

impl LoudnessMakeup {
    pub const MAX_EXTRA_GAIN: f32 = 1.5;

    pub fn new() -> Self {
        Self
    }
}

impl Stage for LoudnessMakeup {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.loudness_gain() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let gain = 1.0 + params.loudness_gain() * Self::MAX_EXTRA_GAIN;
        buffer.iter_mut().for_each(|s| *s *= gain);
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "LoudnessMakeup"
    }
}

// ============================================================================
// LIMITER
// ============================================================================

/// Soft tanh limiter
///
/// Samples at or below the ceiling pass untouched. Anything above it is
/// folded through `ceiling * tanh(x / ceiling)`, which stays under the
/// ceiling however hot the input. A ceiling of 1.0 disables the stage and
/// leaves the hard clip as the only safety net.
#[derive(Debug, Clone, Default)]
pub struct Limiter;

impl Limiter {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    pub fn limit(sample: f32, ceiling: f32) -> f32 {
        let magnitude = sample.abs();
        if magnitude <= ceiling {
            return sample;
        }
        (ceiling * (magnitude / ceiling).tanh()).copysign(sample)
    }
}

impl Stage for Limiter {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.limiter_ceiling() < 1.0 - 1e-3
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let ceiling = params.limiter_ceiling();
        buffer.iter_mut().for_each(|s| *s = Self::limit(*s, ceiling));
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Limiter"
    }
}

// ============================================================================
// MASTER VOLUME & HARD CLIP
// ============================================================================

/// Linear master gain
#[derive(Debug, Clone, Default)]
pub struct MasterVolume;

impl MasterVolume {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for MasterVolume {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        (params.volume() - 1.0).abs() > 0.001
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let volume = params.volume();
        buffer.iter_mut().for_each(|s| *s *= volume);
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "MasterVolume"
    }
}

/// Final clamp to [-1, 1]; non-finite samples are flushed to silence
#[derive(Debug, Clone, Default)]
pub struct HardClip;

impl HardClip {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    pub fn clip(sample: f32) -> f32 {
        if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Stage for HardClip {
    fn is_active(&self, _params: &EffectParameters, _layout: ChannelLayout) -> bool {
        true
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, _params: &EffectParameters) {
        buffer.iter_mut().for_each(|s| *s = Self::clip(*s));
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "HardClip"
    }
}
