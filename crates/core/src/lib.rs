//! Euphoriae real-time audio effects engine
//!
//! The host owns an [`AudioEngine`], pushes interleaved `f32` blocks through
//! [`AudioEngine::process_audio`] from its render thread and adjusts effects
//! from any other thread through an [`EngineController`].

pub mod domain;

pub use domain::audio::{AudioError, ChannelLayout};
pub use domain::config::{ConfigError, EffectPreset, EngineConfig, EqualizerMode};
pub use domain::dsp::StretchOutcome;
pub use domain::engine::{AudioEngine, EngineController};
pub use domain::params::{
    EffectParameters, EffectSettings, HeadphoneType, ReverbPreset, SurroundMode, EQ_BAND_COUNT,
};
