//! Fixed-order effect pipeline
//!
//! Every stage is constructed once when the engine is created; processing
//! walks the stages in order and skips the ones with nothing to do. A stage
//! that switches back on after being skipped starts from cleared state so
//! stale filter memory and delay tails never leak into new audio.

use super::dynamics::{Compressor, HardClip, Limiter, LoudnessMakeup, MasterVolume, VolumeLeveler};
use super::reverb::Reverb;
use super::stereo::{ChannelSeparation, StereoBalance, Surround3d, Virtualizer};
use super::tone::{BassBoost, Clarity, Equalizer, SpectrumExtension, TrebleBoost, TubeWarmth};
use super::Stage;
use crate::domain::audio::ChannelLayout;
use crate::domain::config::EngineConfig;
use crate::domain::params::EffectParameters;

/// The full chain of stages in processing order
pub struct EffectPipeline {
    stages: Vec<Box<dyn Stage>>,
    was_active: Vec<bool>,
}

impl EffectPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        let sample_rate = config.sample_rate;
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(VolumeLeveler::new()),
            Box::new(BassBoost::new()),
            Box::new(TrebleBoost::new()),
            Box::new(Equalizer::new(config.equalizer_mode, sample_rate)),
            Box::new(Clarity::new()),
            Box::new(TubeWarmth::new()),
            Box::new(SpectrumExtension::new()),
            Box::new(Compressor::new(sample_rate)),
            Box::new(LoudnessMakeup::new()),
            Box::new(Reverb::new(sample_rate)),
            Box::new(Virtualizer::new()),
            Box::new(Surround3d::new(sample_rate, config.surround_capacity_frames)),
            Box::new(ChannelSeparation::new()),
            Box::new(StereoBalance::new()),
            Box::new(Limiter::new()),
            Box::new(MasterVolume::new()),
            Box::new(HardClip::new()),
        ];
        let was_active = vec![false; stages.len()];

        Self { stages, was_active }
    }

    /// Run one interleaved block through every active stage
    pub fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        for (stage, was_active) in self.stages.iter_mut().zip(self.was_active.iter_mut()) {
            let active = stage.is_active(params, layout);
            if active {
                if !*was_active {
                    stage.reset();
                }
                stage.process(buffer, layout, params);
            }
            *was_active = active;
        }
    }

    /// Clear the state of every stage
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.was_active.fill(false);
    }

    /// Stage names in processing order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Names of the stages that would run for the given parameters
    pub fn active_stage_names(&self, params: &EffectParameters, layout: ChannelLayout) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.is_active(params, layout))
            .map(|s| s.name())
            .collect()
    }

    /// Get the number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
