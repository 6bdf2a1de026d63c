//! Digital signal processing stages of the effects engine
//!
//! This module provides:
//! - Tone stages (bass, treble, equalizer, clarity, tube warmth, spectrum extension)
//! - Dynamics stages (leveler, compressor, loudness makeup, limiter, volume, hard clip)
//! - Schroeder reverb built on fixed-capacity comb/allpass lines
//! - Stereo stages (virtualizer, 3D surround, channel separation, balance)
//! - A WSOLA time-stretch / pitch-shift processor
//!
//! All stages are designed for:
//! - Zero allocations in the hot path (state is sized at construction)
//! - In-place processing of interleaved f32 blocks
//! - Lock-free parameter reads, once per block

pub mod delay;
pub mod dynamics;
pub mod filter;
pub mod pipeline;
pub mod reverb;
pub mod stereo;
pub mod time_stretch;
pub mod tone;

use crate::domain::audio::ChannelLayout;
use crate::domain::params::EffectParameters;

pub use delay::{AllpassFilter, CombFilter, DelayLine};
pub use dynamics::{Compressor, HardClip, Limiter, LoudnessMakeup, MasterVolume, VolumeLeveler};
pub use filter::{BiquadCoeffs, BiquadFilter, OnePole};
pub use pipeline::EffectPipeline;
pub use reverb::{Reverb, ReverbTuning};
pub use stereo::{ChannelSeparation, HeadphoneProfile, StereoBalance, Surround3d, Virtualizer};
pub use time_stretch::{StretchOutcome, TimeStretcher};
pub use tone::{BassBoost, Clarity, Equalizer, SpectrumExtension, TrebleBoost, TubeWarmth};

/// Strength below which a normalized effect is treated as off
pub const EFFECT_EPSILON: f32 = 0.01;

/// Maximum number of interleaved channels a stage keeps state for
pub const MAX_CHANNELS: usize = 2;

/// One stage of the processing pipeline
///
/// Stages process interleaved blocks in place. They read their own
/// parameters from the shared store on every call and own all of their
/// filter/delay state.
pub trait Stage: Send {
    /// Whether the stage has audible work to do for this block
    ///
    /// Inactive stages are skipped entirely by the pipeline.
    fn is_active(&self, params: &EffectParameters, layout: ChannelLayout) -> bool;

    /// Process one block in place
    ///
    /// # Requirements
    /// - No allocations, locks, or blocking calls
    /// - `buffer.len()` is a whole number of frames for `layout`
    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters);

    /// Clear filter and delay state
    fn reset(&mut self);

    /// Stage name for debugging/display
    fn name(&self) -> &str;
}
