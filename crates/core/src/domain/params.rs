//! Effect parameter store shared between the control and audio threads
//!
//! Every parameter is an independent atomic scalar. A control thread may
//! call any setter at any time; the audio thread reads each value once per
//! block. There is no cross-field consistency: a block may observe a new
//! bass boost together with an old treble boost, which is fine because the
//! stages are evaluated independently.
//!
//! Setters never reject input. Values are clamped into their documented
//! range and NaN falls back to the parameter default.

use atomic_float::AtomicF32;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tracing::debug;

/// Number of equalizer bands exposed to the host
pub const EQ_BAND_COUNT: usize = 10;

/// Valid range and default of a scalar parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp a raw value into range; NaN maps to the default
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Parameter ranges
///
/// Normalized strengths share the 0..1 range; the rest are listed explicitly.
pub mod ranges {
    use super::ParamRange;

    pub const VOLUME: ParamRange = ParamRange::new(0.0, 2.0, 1.0);
    pub const STRENGTH: ParamRange = ParamRange::new(0.0, 1.0, 0.0);
    pub const CHANNEL_SEPARATION: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
    pub const EQ_BAND_DB: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);
    pub const LIMITER_CEILING: ParamRange = ParamRange::new(0.5, 1.0, 0.95);
    pub const STEREO_BALANCE: ParamRange = ParamRange::new(-1.0, 1.0, 0.0);
    pub const REVERB_WET_MIX: ParamRange = ParamRange::new(0.0, 1.0, 0.0);
    pub const TEMPO: ParamRange = ParamRange::new(0.5, 2.0, 1.0);
    pub const PITCH_SEMITONES: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);
}

// ============================================================================
// ENUMERATED PARAMETERS
// ============================================================================

/// Reverb room model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    #[default]
    Off,
    SmallRoom,
    MediumRoom,
    LargeRoom,
    MediumHall,
    LargeHall,
    Plate,
}

impl ReverbPreset {
    pub const ALL: [ReverbPreset; 7] = [
        ReverbPreset::Off,
        ReverbPreset::SmallRoom,
        ReverbPreset::MediumRoom,
        ReverbPreset::LargeRoom,
        ReverbPreset::MediumHall,
        ReverbPreset::LargeHall,
        ReverbPreset::Plate,
    ];

    /// Map a raw index onto a preset, clamping out-of-range values
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// Headphone model used to tune the surround crossfeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadphoneType {
    #[default]
    Generic,
    InEar,
    OverEar,
    OpenBack,
    Studio,
}

impl HeadphoneType {
    pub const ALL: [HeadphoneType; 5] = [
        HeadphoneType::Generic,
        HeadphoneType::InEar,
        HeadphoneType::OverEar,
        HeadphoneType::OpenBack,
        HeadphoneType::Studio,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// Surround listening mode, a bulk preset over the surround parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurroundMode {
    #[default]
    Off,
    Music,
    Movie,
    Game,
    Podcast,
}

/// Values written by [`SurroundMode::preset`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurroundPreset {
    pub surround_3d: f32,
    pub room_size: f32,
    pub surround_level: f32,
    pub headphone_surround: bool,
}

impl SurroundMode {
    pub const ALL: [SurroundMode; 5] = [
        SurroundMode::Off,
        SurroundMode::Music,
        SurroundMode::Movie,
        SurroundMode::Game,
        SurroundMode::Podcast,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, Self::ALL.len() as i32 - 1) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn preset(self) -> SurroundPreset {
        let (surround_3d, room_size, surround_level, headphone_surround) = match self {
            SurroundMode::Off => (0.0, 0.0, 0.0, false),
            SurroundMode::Music => (0.35, 0.3, 0.3, true),
            SurroundMode::Movie => (0.7, 0.7, 0.6, true),
            SurroundMode::Game => (0.6, 0.4, 0.5, true),
            SurroundMode::Podcast => (0.15, 0.1, 0.1, false),
        };
        SurroundPreset {
            surround_3d,
            room_size,
            surround_level,
            headphone_surround,
        }
    }
}

// ============================================================================
// PARAMETER STORE
// ============================================================================

/// Lock-free store of every effect parameter
#[derive(Debug)]
pub struct EffectParameters {
    volume: AtomicF32,
    bass_boost: AtomicF32,
    virtualizer: AtomicF32,
    clarity: AtomicF32,
    tube_warmth: AtomicF32,
    spectrum_extension: AtomicF32,
    treble_boost: AtomicF32,
    volume_leveler: AtomicF32,
    compressor_strength: AtomicF32,
    loudness_gain: AtomicF32,
    surround_3d: AtomicF32,
    room_size: AtomicF32,
    surround_level: AtomicF32,
    channel_separation: AtomicF32,
    equalizer_bands: [AtomicF32; EQ_BAND_COUNT],
    limiter_ceiling: AtomicF32,
    stereo_balance: AtomicF32,
    reverb_preset: AtomicU8,
    reverb_wet_mix: AtomicF32,
    tempo: AtomicF32,
    pitch_semitones: AtomicF32,
    headphone_type: AtomicU8,
    surround_mode: AtomicU8,
    headphone_surround: AtomicBool,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectParameters {
    /// Create a store holding every default value
    pub fn new() -> Self {
        let strength = || AtomicF32::new(ranges::STRENGTH.default);
        Self {
            volume: AtomicF32::new(ranges::VOLUME.default),
            bass_boost: strength(),
            virtualizer: strength(),
            clarity: strength(),
            tube_warmth: strength(),
            spectrum_extension: strength(),
            treble_boost: strength(),
            volume_leveler: strength(),
            compressor_strength: strength(),
            loudness_gain: strength(),
            surround_3d: strength(),
            room_size: strength(),
            surround_level: strength(),
            channel_separation: AtomicF32::new(ranges::CHANNEL_SEPARATION.default),
            equalizer_bands: std::array::from_fn(|_| AtomicF32::new(ranges::EQ_BAND_DB.default)),
            limiter_ceiling: AtomicF32::new(ranges::LIMITER_CEILING.default),
            stereo_balance: AtomicF32::new(ranges::STEREO_BALANCE.default),
            reverb_preset: AtomicU8::new(ReverbPreset::Off as u8),
            reverb_wet_mix: AtomicF32::new(ranges::REVERB_WET_MIX.default),
            tempo: AtomicF32::new(ranges::TEMPO.default),
            pitch_semitones: AtomicF32::new(ranges::PITCH_SEMITONES.default),
            headphone_type: AtomicU8::new(HeadphoneType::Generic as u8),
            surround_mode: AtomicU8::new(SurroundMode::Off as u8),
            headphone_surround: AtomicBool::new(false),
        }
    }

    #[inline]
    fn store(cell: &AtomicF32, range: ParamRange, value: f32) -> f32 {
        let clamped = range.clamp(value);
        cell.store(clamped, Ordering::Relaxed);
        clamped
    }

    // ---- Basic effects -----------------------------------------------------

    pub fn set_volume(&self, volume: f32) {
        let v = Self::store(&self.volume, ranges::VOLUME, volume);
        debug!("Volume set to: {:.2}", v);
    }

    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_bass_boost(&self, strength: f32) {
        let v = Self::store(&self.bass_boost, ranges::STRENGTH, strength);
        debug!("Bass boost set to: {:.2}", v);
    }

    pub fn bass_boost(&self) -> f32 {
        self.bass_boost.load(Ordering::Relaxed)
    }

    pub fn set_virtualizer(&self, strength: f32) {
        let v = Self::store(&self.virtualizer, ranges::STRENGTH, strength);
        debug!("Virtualizer set to: {:.2}", v);
    }

    pub fn virtualizer(&self) -> f32 {
        self.virtualizer.load(Ordering::Relaxed)
    }

    /// Set one equalizer band; out-of-range band indices are ignored
    pub fn set_equalizer_band(&self, band: i32, gain_db: f32) {
        if let Some(cell) = usize::try_from(band)
            .ok()
            .and_then(|b| self.equalizer_bands.get(b))
        {
            let v = Self::store(cell, ranges::EQ_BAND_DB, gain_db);
            debug!("EQ band {} set to: {:.2} dB", band, v);
        }
    }

    /// Gain of one equalizer band in dB (0.0 for unknown bands)
    pub fn equalizer_band(&self, band: i32) -> f32 {
        usize::try_from(band)
            .ok()
            .and_then(|b| self.equalizer_bands.get(b))
            .map(|cell| cell.load(Ordering::Relaxed))
            .unwrap_or(ranges::EQ_BAND_DB.default)
    }

    /// Snapshot of all band gains, read band by band
    pub fn equalizer_bands(&self) -> [f32; EQ_BAND_COUNT] {
        std::array::from_fn(|i| self.equalizer_bands[i].load(Ordering::Relaxed))
    }

    // ---- Tone ----------------------------------------------------------------

    pub fn set_clarity(&self, level: f32) {
        let v = Self::store(&self.clarity, ranges::STRENGTH, level);
        debug!("Clarity set to: {:.2}", v);
    }

    pub fn clarity(&self) -> f32 {
        self.clarity.load(Ordering::Relaxed)
    }

    pub fn set_tube_warmth(&self, warmth: f32) {
        let v = Self::store(&self.tube_warmth, ranges::STRENGTH, warmth);
        debug!("Tube warmth set to: {:.2}", v);
    }

    pub fn tube_warmth(&self) -> f32 {
        self.tube_warmth.load(Ordering::Relaxed)
    }

    pub fn set_spectrum_extension(&self, level: f32) {
        let v = Self::store(&self.spectrum_extension, ranges::STRENGTH, level);
        debug!("Spectrum extension set to: {:.2}", v);
    }

    pub fn spectrum_extension(&self) -> f32 {
        self.spectrum_extension.load(Ordering::Relaxed)
    }

    pub fn set_treble_boost(&self, level: f32) {
        let v = Self::store(&self.treble_boost, ranges::STRENGTH, level);
        debug!("Treble boost set to: {:.2}", v);
    }

    pub fn treble_boost(&self) -> f32 {
        self.treble_boost.load(Ordering::Relaxed)
    }

    // ---- Dynamics ------------------------------------------------------------

    pub fn set_volume_leveler(&self, level: f32) {
        let v = Self::store(&self.volume_leveler, ranges::STRENGTH, level);
        debug!("Volume leveler set to: {:.2}", v);
    }

    pub fn volume_leveler(&self) -> f32 {
        self.volume_leveler.load(Ordering::Relaxed)
    }

    pub fn set_compressor_strength(&self, strength: f32) {
        let v = Self::store(&self.compressor_strength, ranges::STRENGTH, strength);
        debug!("Compressor strength set to: {:.2}", v);
    }

    pub fn compressor_strength(&self) -> f32 {
        self.compressor_strength.load(Ordering::Relaxed)
    }

    pub fn set_loudness_gain(&self, gain: f32) {
        let v = Self::store(&self.loudness_gain, ranges::STRENGTH, gain);
        debug!("Loudness gain set to: {:.2}", v);
    }

    pub fn loudness_gain(&self) -> f32 {
        self.loudness_gain.load(Ordering::Relaxed)
    }

    pub fn set_limiter_ceiling(&self, ceiling: f32) {
        let v = Self::store(&self.limiter_ceiling, ranges::LIMITER_CEILING, ceiling);
        debug!("Limiter ceiling set to: {:.2}", v);
    }

    pub fn limiter_ceiling(&self) -> f32 {
        self.limiter_ceiling.load(Ordering::Relaxed)
    }

    // ---- Reverb --------------------------------------------------------------

    pub fn set_reverb(&self, preset: ReverbPreset, wet_mix: f32) {
        self.reverb_preset.store(preset as u8, Ordering::Relaxed);
        let v = Self::store(&self.reverb_wet_mix, ranges::REVERB_WET_MIX, wet_mix);
        debug!("Reverb set to: {:?} wet={:.2}", preset, v);
    }

    pub fn set_reverb_preset(&self, preset: ReverbPreset) {
        self.reverb_preset.store(preset as u8, Ordering::Relaxed);
        debug!("Reverb preset set to: {:?}", preset);
    }

    pub fn reverb_preset(&self) -> ReverbPreset {
        ReverbPreset::from_index(i32::from(self.reverb_preset.load(Ordering::Relaxed)))
    }

    pub fn set_reverb_wet_mix(&self, wet_mix: f32) {
        let v = Self::store(&self.reverb_wet_mix, ranges::REVERB_WET_MIX, wet_mix);
        debug!("Reverb wet mix set to: {:.2}", v);
    }

    pub fn reverb_wet_mix(&self) -> f32 {
        self.reverb_wet_mix.load(Ordering::Relaxed)
    }

    // ---- Surround & stereo -------------------------------------------------

    pub fn set_surround_3d(&self, depth: f32) {
        let v = Self::store(&self.surround_3d, ranges::STRENGTH, depth);
        debug!("3D surround set to: {:.2}", v);
    }

    pub fn surround_3d(&self) -> f32 {
        self.surround_3d.load(Ordering::Relaxed)
    }

    pub fn set_room_size(&self, size: f32) {
        let v = Self::store(&self.room_size, ranges::STRENGTH, size);
        debug!("Room size set to: {:.2}", v);
    }

    pub fn room_size(&self) -> f32 {
        self.room_size.load(Ordering::Relaxed)
    }

    pub fn set_surround_level(&self, level: f32) {
        let v = Self::store(&self.surround_level, ranges::STRENGTH, level);
        debug!("Surround level set to: {:.2}", v);
    }

    pub fn surround_level(&self) -> f32 {
        self.surround_level.load(Ordering::Relaxed)
    }

    pub fn set_headphone_surround(&self, enabled: bool) {
        self.headphone_surround.store(enabled, Ordering::Relaxed);
        debug!("Headphone surround set to: {}", enabled);
    }

    pub fn headphone_surround(&self) -> bool {
        self.headphone_surround.load(Ordering::Relaxed)
    }

    pub fn set_headphone_type(&self, headphone: HeadphoneType) {
        self.headphone_type.store(headphone as u8, Ordering::Relaxed);
        debug!("Headphone type set to: {:?}", headphone);
    }

    pub fn headphone_type(&self) -> HeadphoneType {
        HeadphoneType::from_index(i32::from(self.headphone_type.load(Ordering::Relaxed)))
    }

    /// Select a surround mode and bulk-write the surround parameters it implies
    ///
    /// The writes are individually atomic; a concurrent block may see a mix
    /// of old and new surround values for one buffer.
    pub fn set_surround_mode(&self, mode: SurroundMode) {
        let preset = mode.preset();
        self.surround_mode.store(mode as u8, Ordering::Relaxed);
        self.surround_3d.store(preset.surround_3d, Ordering::Relaxed);
        self.room_size.store(preset.room_size, Ordering::Relaxed);
        self.surround_level.store(preset.surround_level, Ordering::Relaxed);
        self.headphone_surround
            .store(preset.headphone_surround, Ordering::Relaxed);
        debug!("Surround mode set to: {:?}", mode);
    }

    pub fn surround_mode(&self) -> SurroundMode {
        SurroundMode::from_index(i32::from(self.surround_mode.load(Ordering::Relaxed)))
    }

    pub fn set_stereo_balance(&self, balance: f32) {
        let v = Self::store(&self.stereo_balance, ranges::STEREO_BALANCE, balance);
        debug!("Stereo balance set to: {:.2}", v);
    }

    pub fn stereo_balance(&self) -> f32 {
        self.stereo_balance.load(Ordering::Relaxed)
    }

    pub fn set_channel_separation(&self, separation: f32) {
        let v = Self::store(&self.channel_separation, ranges::CHANNEL_SEPARATION, separation);
        debug!("Channel separation set to: {:.2}", v);
    }

    pub fn channel_separation(&self) -> f32 {
        self.channel_separation.load(Ordering::Relaxed)
    }

    // ---- Tempo / pitch -----------------------------------------------------

    pub fn set_tempo(&self, tempo: f32) {
        let v = Self::store(&self.tempo, ranges::TEMPO, tempo);
        debug!("Tempo set to: {:.2}", v);
    }

    pub fn tempo(&self) -> f32 {
        self.tempo.load(Ordering::Relaxed)
    }

    pub fn set_pitch_semitones(&self, semitones: f32) {
        let v = Self::store(&self.pitch_semitones, ranges::PITCH_SEMITONES, semitones);
        debug!("Pitch set to: {:.2} semitones", v);
    }

    pub fn pitch_semitones(&self) -> f32 {
        self.pitch_semitones.load(Ordering::Relaxed)
    }

    /// Pitch ratio derived from the semitone offset
    pub fn pitch_ratio(&self) -> f32 {
        crate::domain::audio::semitones_to_ratio(self.pitch_semitones())
    }
}

// ============================================================================
// SERIALIZABLE SNAPSHOT
// ============================================================================

/// Plain snapshot of every parameter, used for presets
///
/// Missing fields deserialize to their defaults, so partial preset files
/// only need to name the effects they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub volume: f32,
    pub bass_boost: f32,
    pub virtualizer: f32,
    pub clarity: f32,
    pub tube_warmth: f32,
    pub spectrum_extension: f32,
    pub treble_boost: f32,
    pub volume_leveler: f32,
    pub compressor_strength: f32,
    pub loudness_gain: f32,
    pub equalizer_bands: [f32; EQ_BAND_COUNT],
    pub limiter_ceiling: f32,
    pub reverb_preset: ReverbPreset,
    pub reverb_wet_mix: f32,
    pub surround_mode: SurroundMode,
    pub surround_3d: f32,
    pub room_size: f32,
    pub surround_level: f32,
    pub headphone_surround: bool,
    pub headphone_type: HeadphoneType,
    pub stereo_balance: f32,
    pub channel_separation: f32,
    pub tempo: f32,
    pub pitch_semitones: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self::capture(&EffectParameters::new())
    }
}

impl EffectSettings {
    /// Read every parameter from a live store
    pub fn capture(params: &EffectParameters) -> Self {
        Self {
            volume: params.volume(),
            bass_boost: params.bass_boost(),
            virtualizer: params.virtualizer(),
            clarity: params.clarity(),
            tube_warmth: params.tube_warmth(),
            spectrum_extension: params.spectrum_extension(),
            treble_boost: params.treble_boost(),
            volume_leveler: params.volume_leveler(),
            compressor_strength: params.compressor_strength(),
            loudness_gain: params.loudness_gain(),
            equalizer_bands: params.equalizer_bands(),
            limiter_ceiling: params.limiter_ceiling(),
            reverb_preset: params.reverb_preset(),
            reverb_wet_mix: params.reverb_wet_mix(),
            surround_mode: params.surround_mode(),
            surround_3d: params.surround_3d(),
            room_size: params.room_size(),
            surround_level: params.surround_level(),
            headphone_surround: params.headphone_surround(),
            headphone_type: params.headphone_type(),
            stereo_balance: params.stereo_balance(),
            channel_separation: params.channel_separation(),
            tempo: params.tempo(),
            pitch_semitones: params.pitch_semitones(),
        }
    }

    /// Write every field through the clamping setters
    ///
    /// The surround mode is applied first so explicit surround values in
    /// the snapshot win over the mode's bulk preset.
    pub fn apply_to(&self, params: &EffectParameters) {
        params.set_surround_mode(self.surround_mode);
        params.set_surround_3d(self.surround_3d);
        params.set_room_size(self.room_size);
        params.set_surround_level(self.surround_level);
        params.set_headphone_surround(self.headphone_surround);
        params.set_headphone_type(self.headphone_type);

        params.set_volume(self.volume);
        params.set_bass_boost(self.bass_boost);
        params.set_virtualizer(self.virtualizer);
        params.set_clarity(self.clarity);
        params.set_tube_warmth(self.tube_warmth);
        params.set_spectrum_extension(self.spectrum_extension);
        params.set_treble_boost(self.treble_boost);
        params.set_volume_leveler(self.volume_leveler);
        params.set_compressor_strength(self.compressor_strength);
        params.set_loudness_gain(self.loudness_gain);
        for (band, gain) in self.equalizer_bands.iter().enumerate() {
            params.set_equalizer_band(band as i32, *gain);
        }
        params.set_limiter_ceiling(self.limiter_ceiling);
        params.set_reverb(self.reverb_preset, self.reverb_wet_mix);
        params.set_stereo_balance(self.stereo_balance);
        params.set_channel_separation(self.channel_separation);
        params.set_tempo(self.tempo);
        params.set_pitch_semitones(self.pitch_semitones);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let params = EffectParameters::new();
        assert_eq!(params.volume(), 1.0);
        assert_eq!(params.bass_boost(), 0.0);
        assert_eq!(params.channel_separation(), 0.5);
        assert_eq!(params.limiter_ceiling(), 0.95);
        assert_eq!(params.stereo_balance(), 0.0);
        assert_eq!(params.reverb_preset(), ReverbPreset::Off);
        assert_eq!(params.tempo(), 1.0);
        assert_eq!(params.pitch_semitones(), 0.0);
        assert_eq!(params.pitch_ratio(), 1.0);
        assert_eq!(params.headphone_type(), HeadphoneType::Generic);
        assert_eq!(params.surround_mode(), SurroundMode::Off);
        assert!(!params.headphone_surround());
        assert_eq!(params.equalizer_bands(), [0.0; EQ_BAND_COUNT]);
    }

    #[test]
    fn test_setters_clamp() {
        let params = EffectParameters::new();

        params.set_volume(5.0);
        assert_eq!(params.volume(), 2.0);
        params.set_volume(-1.0);
        assert_eq!(params.volume(), 0.0);

        params.set_limiter_ceiling(0.1);
        assert_eq!(params.limiter_ceiling(), 0.5);

        params.set_stereo_balance(-3.0);
        assert_eq!(params.stereo_balance(), -1.0);

        params.set_tempo(10.0);
        assert_eq!(params.tempo(), 2.0);

        params.set_pitch_semitones(-40.0);
        assert_eq!(params.pitch_semitones(), -12.0);
        assert!((params.pitch_ratio() - 0.5).abs() < 1e-6);

        params.set_equalizer_band(3, 20.0);
        assert_eq!(params.equalizer_band(3), 12.0);
    }

    #[test]
    fn test_nan_falls_back_to_default() {
        let params = EffectParameters::new();
        params.set_volume(0.3);
        params.set_volume(f32::NAN);
        assert_eq!(params.volume(), 1.0);

        params.set_channel_separation(f32::NAN);
        assert_eq!(params.channel_separation(), 0.5);
    }

    #[test]
    fn test_equalizer_band_out_of_range_ignored() {
        let params = EffectParameters::new();
        params.set_equalizer_band(-1, 6.0);
        params.set_equalizer_band(10, 6.0);
        assert_eq!(params.equalizer_bands(), [0.0; EQ_BAND_COUNT]);
        assert_eq!(params.equalizer_band(42), 0.0);
    }

    #[test]
    fn test_enum_index_clamping() {
        assert_eq!(ReverbPreset::from_index(-4), ReverbPreset::Off);
        assert_eq!(ReverbPreset::from_index(6), ReverbPreset::Plate);
        assert_eq!(ReverbPreset::from_index(99), ReverbPreset::Plate);
        assert_eq!(HeadphoneType::from_index(1), HeadphoneType::InEar);
        assert_eq!(HeadphoneType::from_index(7), HeadphoneType::Studio);
        assert_eq!(SurroundMode::from_index(2), SurroundMode::Movie);
        assert_eq!(SurroundMode::from_index(-1), SurroundMode::Off);
        assert_eq!(SurroundMode::Game.index(), 3);
    }

    #[test]
    fn test_surround_mode_bulk_sets() {
        let params = EffectParameters::new();
        params.set_surround_mode(SurroundMode::Movie);

        let preset = SurroundMode::Movie.preset();
        assert_eq!(params.surround_mode(), SurroundMode::Movie);
        assert_eq!(params.surround_3d(), preset.surround_3d);
        assert_eq!(params.room_size(), preset.room_size);
        assert_eq!(params.surround_level(), preset.surround_level);
        assert!(params.headphone_surround());

        params.set_surround_mode(SurroundMode::Off);
        assert_eq!(params.surround_3d(), 0.0);
        assert!(!params.headphone_surround());
    }

    #[test]
    fn test_settings_capture_apply() {
        let source = EffectParameters::new();
        source.set_bass_boost(0.7);
        source.set_equalizer_band(0, -4.0);
        source.set_reverb(ReverbPreset::LargeHall, 0.4);
        source.set_headphone_type(HeadphoneType::Studio);
        source.set_surround_3d(0.25);

        let settings = EffectSettings::capture(&source);
        let target = EffectParameters::new();
        settings.apply_to(&target);

        assert_eq!(EffectSettings::capture(&target), settings);
        assert_eq!(target.reverb_preset(), ReverbPreset::LargeHall);
        assert_eq!(target.surround_3d(), 0.25);
    }

    proptest! {
        #[test]
        fn test_strength_setters_clamp(value in any::<f32>()) {
            let params = EffectParameters::new();
            params.set_bass_boost(value);
            params.set_volume(value);
            params.set_limiter_ceiling(value);

            let expected = |range: ParamRange| range.clamp(value);
            prop_assert_eq!(params.bass_boost(), expected(ranges::STRENGTH));
            prop_assert_eq!(params.volume(), expected(ranges::VOLUME));
            prop_assert_eq!(params.limiter_ceiling(), expected(ranges::LIMITER_CEILING));
        }

        #[test]
        fn test_in_range_values_round_trip(value in -12.0f32..=12.0, band in 0i32..10) {
            let params = EffectParameters::new();
            params.set_equalizer_band(band, value);
            params.set_pitch_semitones(value);
            prop_assert_eq!(params.equalizer_band(band), value);
            prop_assert_eq!(params.pitch_semitones(), value);
        }
    }
}
