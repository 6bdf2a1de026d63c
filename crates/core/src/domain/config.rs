//! Configuration management for Euphoriae
//!
//! This module provides:
//! - Engine construction settings (sample rate, equalizer mode, buffer sizes)
//! - Named effect presets and the built-in factory set
//!
//! Both types derive serde so a control layer can persist them in whatever
//! format it likes; the engine itself never touches the filesystem.

use crate::domain::dsp::time_stretch::TimeStretcher;
use crate::domain::params::{EffectSettings, HeadphoneType, ReverbPreset, SurroundMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::domain::dsp::tone::EqualizerMode;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Settings fixed for the lifetime of one engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate of every buffer the host will push
    pub sample_rate: u32,

    /// How the ten equalizer bands are applied
    pub equalizer_mode: EqualizerMode,

    /// Minimum frames per surround delay line (raised when the sample rate needs more)
    pub surround_capacity_frames: usize,

    /// Analysis window of the time stretcher in frames
    pub stretch_window_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            equalizer_mode: EqualizerMode::default(),
            surround_capacity_frames: 2048,
            stretch_window_frames: TimeStretcher::DEFAULT_WINDOW,
        }
    }
}

impl EngineConfig {
    pub const MIN_SAMPLE_RATE: u32 = 8000;
    pub const MAX_SAMPLE_RATE: u32 = 384_000;
    pub const MAX_STRETCH_WINDOW: usize = 16384;

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Check every field is usable by the engine
    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_SAMPLE_RATE..=Self::MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::Invalid(format!(
                "sample rate {} outside {}..={}",
                self.sample_rate,
                Self::MIN_SAMPLE_RATE,
                Self::MAX_SAMPLE_RATE
            )));
        }
        if self.surround_capacity_frames < 2 {
            return Err(ConfigError::Invalid(
                "surround capacity must hold at least 2 frames".to_string(),
            ));
        }
        if !(TimeStretcher::MIN_WINDOW..=Self::MAX_STRETCH_WINDOW).contains(&self.stretch_window_frames) {
            return Err(ConfigError::Invalid(format!(
                "stretch window {} outside {}..={}",
                self.stretch_window_frames,
                TimeStretcher::MIN_WINDOW,
                Self::MAX_STRETCH_WINDOW
            )));
        }
        Ok(())
    }
}

// ============================================================================
// EFFECT PRESETS
// ============================================================================

/// A named snapshot of every effect parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPreset {
    pub name: String,
    #[serde(default)]
    pub settings: EffectSettings,
}

impl EffectPreset {
    pub fn new(name: impl Into<String>, settings: EffectSettings) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// Built-in presets shipped with the engine
    pub fn factory() -> Vec<EffectPreset> {
        let flat = EffectSettings::default();

        let bass_heavy = EffectSettings {
            bass_boost: 0.7,
            loudness_gain: 0.2,
            equalizer_bands: [6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0, -1.0],
            ..Default::default()
        };

        let hall = SurroundMode::Movie.preset();
        let concert_hall = EffectSettings {
            reverb_preset: ReverbPreset::LargeHall,
            reverb_wet_mix: 0.35,
            surround_mode: SurroundMode::Movie,
            surround_3d: hall.surround_3d,
            room_size: hall.room_size,
            surround_level: hall.surround_level,
            headphone_surround: hall.headphone_surround,
            headphone_type: HeadphoneType::OverEar,
            ..Default::default()
        };

        let night_mode = EffectSettings {
            volume_leveler: 0.6,
            compressor_strength: 0.8,
            limiter_ceiling: 0.8,
            clarity: 0.3,
            ..Default::default()
        };

        vec![
            EffectPreset::new("flat", flat),
            EffectPreset::new("bass-heavy", bass_heavy),
            EffectPreset::new("concert-hall", concert_hall),
            EffectPreset::new("night-mode", night_mode),
        ]
    }

    /// Look up a built-in preset by name
    pub fn factory_named(name: &str) -> Option<EffectPreset> {
        Self::factory().into_iter().find(|p| p.name == name)
    }
}
