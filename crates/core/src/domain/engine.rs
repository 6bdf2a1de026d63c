//! Engine facade
//!
//! [`AudioEngine`] is owned by the host. The audio thread holds it mutably
//! and calls [`AudioEngine::process_audio`] once per render quantum; control
//! threads change parameters through an [`EngineController`], a cheap
//! cloneable handle onto the same lock-free parameter store.
//!
//! Every operation is safe before [`AudioEngine::create`] and after
//! [`AudioEngine::destroy`]: setters do nothing, getters report defaults and
//! processing leaves the buffer untouched.

use crate::domain::audio::{validate_block, AudioError, ChannelLayout, Result};
use crate::domain::config::EngineConfig;
use crate::domain::dsp::{EffectPipeline, StretchOutcome, TimeStretcher};
use crate::domain::params::{
    EffectParameters, EffectSettings, HeadphoneType, ReverbPreset, SurroundMode,
};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// State that only exists between `create` and `destroy`
struct EngineState {
    params: Arc<EffectParameters>,
    pipeline: EffectPipeline,
    stretcher: TimeStretcher,
}

/// Forwards `f32` setter/getter pairs to the live parameter store
macro_rules! forward_f32 {
    ($($setter:ident / $getter:ident),* $(,)?) => {
        $(
            pub fn $setter(&self, value: f32) {
                if let Some(state) = &self.state {
                    state.params.$setter(value);
                }
            }

            pub fn $getter(&self) -> f32 {
                self.params().$getter()
            }
        )*
    };
}

/// Real-time effects engine
pub struct AudioEngine {
    config: EngineConfig,
    state: Option<EngineState>,
    idle: EffectParameters,
}

impl AudioEngine {
    /// Create an engine for `config`
    ///
    /// No processing state is allocated until [`Self::create`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AudioError::InvalidConfiguration(e.to_string()))?;
        Ok(Self {
            config,
            state: None,
            idle: EffectParameters::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    // ---- Lifecycle ---------------------------------------------------------

    /// Allocate all processing state with default parameters
    ///
    /// Calling `create` on a created engine has no effect.
    pub fn create(&mut self) {
        if self.state.is_some() {
            debug!("Engine already created");
            return;
        }

        self.state = Some(EngineState {
            params: Arc::new(EffectParameters::new()),
            pipeline: EffectPipeline::new(&self.config),
            stretcher: TimeStretcher::new(self.config.stretch_window_frames),
        });

        info!(
            sample_rate = self.config.sample_rate,
            equalizer_mode = ?self.config.equalizer_mode,
            "Audio engine created"
        );
    }

    /// Release all processing state
    ///
    /// Controllers handed out earlier stay valid but no longer affect audio.
    pub fn destroy(&mut self) {
        if self.state.take().is_some() {
            info!("Audio engine destroyed");
        }
    }

    pub fn is_created(&self) -> bool {
        self.state.is_some()
    }

    // ---- Processing --------------------------------------------------------

    /// Transform one interleaved block in place
    ///
    /// Invalid calls (not created, empty buffer, bad frame or channel count)
    /// leave the buffer untouched.
    pub fn process_audio(&mut self, buffer: &mut [f32], num_frames: i32, channel_count: i32) {
        if let Err(e) = self.try_process(buffer, num_frames, channel_count) {
            trace!(error = %e, "Audio buffer rejected");
        }
    }

    /// Like [`Self::process_audio`], reporting why a block was rejected
    pub fn try_process(&mut self, buffer: &mut [f32], num_frames: i32, channel_count: i32) -> Result<()> {
        let state = self.state.as_mut().ok_or(AudioError::NotInitialized)?;
        let layout = validate_block(buffer, num_frames, channel_count)?;
        let len = num_frames as usize * layout.count();

        state.pipeline.process(&mut buffer[..len], layout, &state.params);
        Ok(())
    }

    /// Run interleaved audio through the tempo/pitch stage
    ///
    /// Uses the current tempo and pitch parameters. Unconsumed input must
    /// be fed again on the next call; with tempo 1 and pitch 0 the input is
    /// copied through unchanged.
    pub fn time_stretch(&mut self, input: &[f32], output: &mut [f32], channel_count: i32) -> StretchOutcome {
        let Some(state) = self.state.as_mut() else {
            trace!("Time stretch before create");
            return StretchOutcome::default();
        };
        let Some(layout) = ChannelLayout::from_count(channel_count) else {
            trace!(channel_count, "Time stretch rejected channel count");
            return StretchOutcome::default();
        };

        let tempo = state.params.tempo();
        let pitch_ratio = state.params.pitch_ratio();
        state
            .stretcher
            .process(input, output, layout, tempo, pitch_ratio)
    }

    /// Clear every filter, delay and stretch buffer without touching parameters
    pub fn reset(&mut self) {
        if let Some(state) = &mut self.state {
            state.pipeline.reset();
            state.stretcher.reset();
            debug!("Engine state reset");
        }
    }

    // ---- Control -----------------------------------------------------------

    /// Handle for changing parameters from other threads
    pub fn controller(&self) -> Option<EngineController> {
        self.state.as_ref().map(|state| EngineController {
            params: Arc::clone(&state.params),
        })
    }

    /// Snapshot of every parameter
    pub fn settings(&self) -> EffectSettings {
        EffectSettings::capture(self.params())
    }

    /// Restore a snapshot
    pub fn apply_settings(&self, settings: &EffectSettings) {
        if let Some(state) = &self.state {
            settings.apply_to(&state.params);
        }
    }

    fn params(&self) -> &EffectParameters {
        self.state.as_ref().map_or(&self.idle, |state| state.params.as_ref())
    }

    forward_f32! {
        set_volume / volume,
        set_bass_boost / bass_boost,
        set_virtualizer / virtualizer,
        set_clarity / clarity,
        set_tube_warmth / tube_warmth,
        set_spectrum_extension / spectrum_extension,
        set_treble_boost / treble_boost,
        set_volume_leveler / volume_leveler,
        set_compressor_strength / compressor_strength,
        set_loudness_gain / loudness_gain,
        set_limiter_ceiling / limiter_ceiling,
        set_reverb_wet_mix / reverb_wet_mix,
        set_surround_3d / surround_3d,
        set_room_size / room_size,
        set_surround_level / surround_level,
        set_stereo_balance / stereo_balance,
        set_channel_separation / channel_separation,
        set_tempo / tempo,
        set_pitch_semitones / pitch_semitones,
    }

    pub fn set_equalizer_band(&self, band: i32, gain_db: f32) {
        if let Some(state) = &self.state {
            state.params.set_equalizer_band(band, gain_db);
        }
    }

    pub fn equalizer_band(&self, band: i32) -> f32 {
        self.params().equalizer_band(band)
    }

    /// Select a reverb preset by index (0 = off) and its wet mix
    pub fn set_reverb(&self, preset: i32, wet_mix: f32) {
        if let Some(state) = &self.state {
            state.params.set_reverb(ReverbPreset::from_index(preset), wet_mix);
        }
    }

    pub fn reverb_preset(&self) -> ReverbPreset {
        self.params().reverb_preset()
    }

    /// Bulk-set the surround parameters from a mode index
    pub fn set_surround_mode(&self, mode: i32) {
        if let Some(state) = &self.state {
            state.params.set_surround_mode(SurroundMode::from_index(mode));
        }
    }

    pub fn surround_mode(&self) -> SurroundMode {
        self.params().surround_mode()
    }

    pub fn set_headphone_type(&self, headphone: i32) {
        if let Some(state) = &self.state {
            state.params.set_headphone_type(HeadphoneType::from_index(headphone));
        }
    }

    pub fn headphone_type(&self) -> HeadphoneType {
        self.params().headphone_type()
    }

    pub fn set_headphone_surround(&self, enabled: bool) {
        if let Some(state) = &self.state {
            state.params.set_headphone_surround(enabled);
        }
    }

    pub fn headphone_surround(&self) -> bool {
        self.params().headphone_surround()
    }

    pub fn pitch_ratio(&self) -> f32 {
        self.params().pitch_ratio()
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            state: None,
            idle: EffectParameters::new(),
        }
    }
}

/// Thread-safe handle onto a created engine's parameters
///
/// Dereferences to [`EffectParameters`], so every setter and getter is
/// available directly.
#[derive(Debug, Clone)]
pub struct EngineController {
    params: Arc<EffectParameters>,
}

impl EngineController {
    pub fn settings(&self) -> EffectSettings {
        EffectSettings::capture(&self.params)
    }

    pub fn apply_settings(&self, settings: &EffectSettings) {
        settings.apply_to(&self.params);
    }
}

impl Deref for EngineController {
    type Target = EffectParameters;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}
