//! Tone-shaping stages
//!
//! Bass and treble boost, the equalizer, clarity, tube warmth and spectrum
//! extension. Each stage keeps one filter state per channel, so left and
//! right never bleed into each other.

use super::filter::{BiquadCoeffs, BiquadFilter, OnePole};
use super::{Stage, EFFECT_EPSILON, MAX_CHANNELS};
use crate::domain::audio::{db_to_gain, ChannelLayout};
use crate::domain::params::{EffectParameters, EQ_BAND_COUNT};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ============================================================================
// BASS BOOST
// ============================================================================

/// One-pole bass extraction, re-added with gain and soft-clipped
#[derive(Debug, Clone, Default)]
pub struct BassBoost {
    lowpass: [OnePole; MAX_CHANNELS],
}

impl BassBoost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for BassBoost {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.bass_boost() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let strength = params.bass_boost();
        let alpha = 0.15 + strength * 0.15;
        let boost = 1.0 + strength * 1.5;

        for frame in buffer.chunks_exact_mut(layout.count()) {
            for (sample, lp) in frame.iter_mut().zip(self.lowpass.iter_mut()) {
                let bass = lp.lowpass(*sample, alpha);
                *sample = (*sample + bass * (boost - 1.0)).tanh();
            }
        }
    }

    fn reset(&mut self) {
        self.lowpass.iter_mut().for_each(OnePole::reset);
    }

    fn name(&self) -> &str {
        "BassBoost"
    }
}

// ============================================================================
// TREBLE BOOST
// ============================================================================

/// One-pole high-pass extraction added back scaled by the boost strength
#[derive(Debug, Clone, Default)]
pub struct TrebleBoost {
    lowpass: [OnePole; MAX_CHANNELS],
}

impl TrebleBoost {
    const ALPHA: f32 = 0.4;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for TrebleBoost {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.treble_boost() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let strength = params.treble_boost();

        for frame in buffer.chunks_exact_mut(layout.count()) {
            for (sample, lp) in frame.iter_mut().zip(self.lowpass.iter_mut()) {
                let treble = lp.highpass(*sample, Self::ALPHA);
                *sample += treble * strength;
            }
        }
    }

    fn reset(&mut self) {
        self.lowpass.iter_mut().for_each(OnePole::reset);
    }

    fn name(&self) -> &str {
        "TrebleBoost"
    }
}

// ============================================================================
// EQUALIZER
// ============================================================================

/// How the ten equalizer bands are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualizerMode {
    /// Average the band gains into one broadband gain
    #[default]
    Averaged,
    /// One peaking biquad per band at the ISO octave centres
    PerBand,
}

/// ISO octave centre frequencies of the ten bands (Hz)
pub const EQ_BAND_FREQUENCIES: [f32; EQ_BAND_COUNT] = [
    31.25, 62.5, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Q of an octave-wide peaking band
const EQ_BAND_Q: f32 = 1.41;

/// Ten-band equalizer
#[derive(Debug, Clone)]
pub struct Equalizer {
    mode: EqualizerMode,
    sample_rate: f32,
    // Gains the per-band coefficients were last computed for
    applied_gains: [f32; EQ_BAND_COUNT],
    filters: [[BiquadFilter; EQ_BAND_COUNT]; MAX_CHANNELS],
}

impl Equalizer {
    /// Bands quieter than this are treated as flat
    const BAND_EPSILON_DB: f32 = 0.1;

    pub fn new(mode: EqualizerMode, sample_rate: u32) -> Self {
        Self {
            mode,
            sample_rate: sample_rate as f32,
            applied_gains: [0.0; EQ_BAND_COUNT],
            filters: std::array::from_fn(|_| std::array::from_fn(|_| BiquadFilter::default())),
        }
    }

    pub fn mode(&self) -> EqualizerMode {
        self.mode
    }

    /// Broadband gain used by [`EqualizerMode::Averaged`]
    pub fn averaged_gain(gains: &[f32; EQ_BAND_COUNT]) -> f32 {
        let mean_db = gains.iter().sum::<f32>() / EQ_BAND_COUNT as f32;
        db_to_gain(mean_db)
    }

    fn update_coefficients(&mut self, gains: &[f32; EQ_BAND_COUNT]) {
        if *gains == self.applied_gains {
            return;
        }
        for (band, &gain_db) in gains.iter().enumerate() {
            let coeffs =
                BiquadCoeffs::peaking(self.sample_rate, EQ_BAND_FREQUENCIES[band], gain_db, EQ_BAND_Q);
            for channel in self.filters.iter_mut() {
                channel[band].set_coeffs(coeffs);
            }
        }
        self.applied_gains = *gains;
        trace!("EQ coefficients updated: {:?}", gains);
    }
}

impl Stage for Equalizer {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params
            .equalizer_bands()
            .iter()
            .any(|g| g.abs() > Self::BAND_EPSILON_DB)
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let gains = params.equalizer_bands();

        match self.mode {
            EqualizerMode::Averaged => {
                let gain = Self::averaged_gain(&gains);
                buffer.iter_mut().for_each(|s| *s *= gain);
            }
            EqualizerMode::PerBand => {
                self.update_coefficients(&gains);
                for frame in buffer.chunks_exact_mut(layout.count()) {
                    for (sample, bands) in frame.iter_mut().zip(self.filters.iter_mut()) {
                        *sample = bands
                            .iter_mut()
                            .fold(*sample, |x, filter| filter.process_sample(x));
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        for channel in self.filters.iter_mut() {
            channel.iter_mut().for_each(BiquadFilter::reset);
        }
    }

    fn name(&self) -> &str {
        "Equalizer"
    }
}

// ============================================================================
// CLARITY
// ============================================================================

/// High-shelf-like emphasis of the top octave
#[derive(Debug, Clone, Default)]
pub struct Clarity {
    lowpass: [OnePole; MAX_CHANNELS],
}

impl Clarity {
    // High alpha keeps only the very top of the spectrum in the high-pass
    const ALPHA: f32 = 0.85;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for Clarity {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.clarity() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let boost = params.clarity() * 2.0;

        for frame in buffer.chunks_exact_mut(layout.count()) {
            for (sample, lp) in frame.iter_mut().zip(self.lowpass.iter_mut()) {
                let air = lp.highpass(*sample, Self::ALPHA);
                *sample += air * boost;
            }
        }
    }

    fn reset(&mut self) {
        self.lowpass.iter_mut().for_each(OnePole::reset);
    }

    fn name(&self) -> &str {
        "Clarity"
    }
}

// ============================================================================
// TUBE WARMTH
// ============================================================================

/// Asymmetric tanh waveshaper blended with the dry signal
///
/// The positive half-wave uses a softer knee than the negative one, which
/// adds even harmonics. Dividing by the drive keeps small-signal gain at 1.
#[derive(Debug, Clone, Default)]
pub struct TubeWarmth;

impl TubeWarmth {
    const POSITIVE_KNEE: f32 = 0.8;
    const NEGATIVE_KNEE: f32 = 1.2;

    pub fn new() -> Self {
        Self
    }

    #[inline]
    pub fn shape(sample: f32, drive: f32) -> f32 {
        let k = if sample >= 0.0 {
            drive * Self::POSITIVE_KNEE
        } else {
            drive * Self::NEGATIVE_KNEE
        };
        (sample * k).tanh() / k
    }
}

impl Stage for TubeWarmth {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.tube_warmth() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let warmth = params.tube_warmth();
        let drive = 1.0 + warmth * 3.0;

        for sample in buffer.iter_mut() {
            let wet = Self::shape(*sample, drive);
            *sample = *sample * (1.0 - warmth) + wet * warmth;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "TubeWarmth"
    }
}

// ============================================================================
// SPECTRUM EXTENSION
// ============================================================================

/// Harmonic exciter: full-wave rectification, high-passed, mixed back in
#[derive(Debug, Clone, Default)]
pub struct SpectrumExtension {
    dc_blocker: [OnePole; MAX_CHANNELS],
}

impl SpectrumExtension {
    const DC_ALPHA: f32 = 0.02;
    const MIX: f32 = 0.3;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for SpectrumExtension {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.spectrum_extension() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let amount = Self::MIX * params.spectrum_extension();

        for frame in buffer.chunks_exact_mut(layout.count()) {
            for (sample, hp) in frame.iter_mut().zip(self.dc_blocker.iter_mut()) {
                let harmonics = hp.highpass(sample.abs(), Self::DC_ALPHA);
                *sample += harmonics * amount;
            }
        }
    }

    fn reset(&mut self) {
        self.dc_blocker.iter_mut().for_each(OnePole::reset);
    }

    fn name(&self) -> &str {
        "SpectrumExtension"
    }
}
