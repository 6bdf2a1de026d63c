//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod params;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioError, ChannelLayout};
pub use config::{ConfigError, EffectPreset, EngineConfig, EqualizerMode};
pub use engine::{AudioEngine, EngineController};
pub use params::{EffectParameters, EffectSettings, HeadphoneType, ReverbPreset, SurroundMode};
