//! Stereo-field stages
//!
//! Virtualizer widening, delay-line 3D surround, channel separation and
//! balance. Every stage here needs two channels; mono blocks are reported
//! inactive and never touched.

use super::delay::DelayLine;
use super::filter::OnePole;
use super::{Stage, EFFECT_EPSILON, MAX_CHANNELS};
use crate::domain::audio::ChannelLayout;
use crate::domain::params::{EffectParameters, HeadphoneType};

// ============================================================================
// VIRTUALIZER
// ============================================================================

/// Widening by subtracting a share of the opposite channel
#[derive(Debug, Clone, Default)]
pub struct Virtualizer;

impl Virtualizer {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Virtualizer {
    fn is_active(&self, params: &EffectParameters, layout: ChannelLayout) -> bool {
        layout.is_stereo() && params.virtualizer() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let strength = params.virtualizer();
        let cross = strength * 0.4;
        let direct = 1.0 + strength * 0.2;

        for frame in buffer.chunks_exact_mut(2) {
            let (left, right) = (frame[0], frame[1]);
            frame[0] = left * direct - right * cross;
            frame[1] = right * direct - left * cross;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Virtualizer"
    }
}

// ============================================================================
// 3D SURROUND
// ============================================================================

/// Per-headphone tuning of the surround crossfeed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadphoneProfile {
    /// Multiplier on the room-derived crossfeed delay
    pub delay_scale: f32,
    /// Share of the delayed opposite channel mixed in at full depth
    pub crossfeed: f32,
    /// Multiplier on the interaural time difference tap
    pub itd_scale: f32,
    /// Low-frequency emphasis added after crossfeed
    pub bass_emphasis: f32,
    /// High-frequency emphasis added after crossfeed
    pub treble_emphasis: f32,
}

impl HeadphoneProfile {
    pub const fn for_type(headphone: HeadphoneType) -> HeadphoneProfile {
        match headphone {
            HeadphoneType::Generic => HeadphoneProfile {
                delay_scale: 1.0,
                crossfeed: 0.30,
                itd_scale: 1.0,
                bass_emphasis: 0.0,
                treble_emphasis: 0.0,
            },
            HeadphoneType::InEar => HeadphoneProfile {
                delay_scale: 0.8,
                crossfeed: 0.35,
                itd_scale: 0.9,
                bass_emphasis: 0.15,
                treble_emphasis: 0.0,
            },
            HeadphoneType::OverEar => HeadphoneProfile {
                delay_scale: 1.1,
                crossfeed: 0.25,
                itd_scale: 1.1,
                bass_emphasis: 0.0,
                treble_emphasis: 0.10,
            },
            HeadphoneType::OpenBack => HeadphoneProfile {
                delay_scale: 1.2,
                crossfeed: 0.20,
                itd_scale: 1.0,
                bass_emphasis: 0.0,
                treble_emphasis: 0.0,
            },
            HeadphoneType::Studio => HeadphoneProfile {
                delay_scale: 1.0,
                crossfeed: 0.22,
                itd_scale: 1.0,
                bass_emphasis: 0.0,
                treble_emphasis: 0.08,
            },
        }
    }

    /// Largest `delay_scale` of any headphone type
    pub fn max_delay_scale() -> f32 {
        HeadphoneType::ALL
            .iter()
            .map(|&h| Self::for_type(h).delay_scale)
            .fold(0.0, f32::max)
    }

    /// Largest `itd_scale` of any headphone type
    pub fn max_itd_scale() -> f32 {
        HeadphoneType::ALL
            .iter()
            .map(|&h| Self::for_type(h).itd_scale)
            .fold(0.0, f32::max)
    }
}

/// Haas-effect crossfeed through one delay line per channel
///
/// The crossfeed delay maps `room_size` linearly onto 0.5..30 ms; a second
/// 0.3 ms tap adds an interaural time difference cue in headphone mode.
#[derive(Debug, Clone)]
pub struct Surround3d {
    sample_rate: f32,
    lines: [DelayLine; MAX_CHANNELS],
    bass: [OnePole; MAX_CHANNELS],
    treble: [OnePole; MAX_CHANNELS],
}

impl Surround3d {
    pub const MIN_DELAY_MS: f32 = 0.5;
    pub const MAX_DELAY_MS: f32 = 30.0;
    pub const ITD_MS: f32 = 0.3;
    /// Smallest line capacity regardless of sample rate
    pub const MIN_CAPACITY: usize = 2048;

    const BASS_ALPHA: f32 = 0.05;
    const TREBLE_ALPHA: f32 = 0.6;

    /// Create the stage with lines of at least `capacity_frames`
    ///
    /// The capacity is raised when needed so every room size and headphone
    /// combination fits at `sample_rate`.
    pub fn new(sample_rate: u32, capacity_frames: usize) -> Self {
        let capacity = capacity_frames.max(Self::required_capacity(sample_rate));
        Self {
            sample_rate: sample_rate as f32,
            lines: std::array::from_fn(|_| DelayLine::with_capacity(capacity)),
            bass: Default::default(),
            treble: Default::default(),
        }
    }

    /// Capacity covering the longest delay at `sample_rate`
    pub fn required_capacity(sample_rate: u32) -> usize {
        let longest_ms = Self::MAX_DELAY_MS * HeadphoneProfile::max_delay_scale();
        let frames = (longest_ms * sample_rate as f32 / 1000.0).ceil() as usize;
        (frames + 1).max(Self::MIN_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.lines[0].capacity()
    }

    /// Crossfeed delay in frames for a room size and headphone type
    pub fn delay_frames(&self, room_size: f32, profile: &HeadphoneProfile) -> usize {
        let ms = Self::MIN_DELAY_MS + room_size * (Self::MAX_DELAY_MS - Self::MIN_DELAY_MS);
        self.ms_to_frames(ms * profile.delay_scale)
    }

    /// Interaural time difference tap in frames
    pub fn itd_frames(&self, profile: &HeadphoneProfile) -> usize {
        self.ms_to_frames(Self::ITD_MS * profile.itd_scale)
    }

    fn ms_to_frames(&self, ms: f32) -> usize {
        ((ms * self.sample_rate / 1000.0).round() as usize).max(1)
    }
}

impl Stage for Surround3d {
    fn is_active(&self, params: &EffectParameters, layout: ChannelLayout) -> bool {
        layout.is_stereo() && params.surround_3d() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let profile = HeadphoneProfile::for_type(params.headphone_type());
        let depth = params.surround_3d();
        let amount = depth * profile.crossfeed;
        let level = 0.5 + params.surround_level();
        let delay = self.delay_frames(params.room_size(), &profile);
        let itd = self.itd_frames(&profile);
        let headphone = params.headphone_surround();
        let direct = 1.0 - amount / 2.0;
        let bass_gain = profile.bass_emphasis * depth;
        let treble_gain = profile.treble_emphasis * depth;

        for frame in buffer.chunks_exact_mut(2) {
            let (left, right) = (frame[0], frame[1]);
            let [line_l, line_r] = &mut self.lines;

            let mut out_l = left * direct + line_r.read(delay) * amount * level;
            let mut out_r = right * direct + line_l.read(delay) * amount * level;

            if headphone {
                out_l += line_r.read(itd) * amount * 0.5;
                out_r += line_l.read(itd) * amount * 0.5;
            }

            line_l.push(left);
            line_r.push(right);

            for (ch, out) in [&mut out_l, &mut out_r].into_iter().enumerate() {
                if bass_gain > 0.0 {
                    *out += self.bass[ch].lowpass(*out, Self::BASS_ALPHA) * bass_gain;
                }
                if treble_gain > 0.0 {
                    *out += self.treble[ch].highpass(*out, Self::TREBLE_ALPHA) * treble_gain;
                }
            }

            frame[0] = out_l;
            frame[1] = out_r;
        }
    }

    fn reset(&mut self) {
        self.lines.iter_mut().for_each(DelayLine::clear);
        self.bass.iter_mut().for_each(OnePole::reset);
        self.treble.iter_mut().for_each(OnePole::reset);
    }

    fn name(&self) -> &str {
        "Surround3d"
    }
}

// ============================================================================
// CHANNEL SEPARATION
// ============================================================================

/// Mid/side width control: 0 collapses to mono, 0.5 is neutral, 1 doubles the side
#[derive(Debug, Clone, Default)]
pub struct ChannelSeparation;

impl ChannelSeparation {
    pub const NEUTRAL: f32 = 0.5;

    pub fn new() -> Self {
        Self
    }
}

impl Stage for ChannelSeparation {
    fn is_active(&self, params: &EffectParameters, layout: ChannelLayout) -> bool {
        layout.is_stereo() && (params.channel_separation() - Self::NEUTRAL).abs() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let width = params.channel_separation() * 2.0;

        for frame in buffer.chunks_exact_mut(2) {
            let mid = (frame[0] + frame[1]) * 0.5;
            let side = (frame[0] - frame[1]) * 0.5 * width;
            frame[0] = mid + side;
            frame[1] = mid - side;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "ChannelSeparation"
    }
}

// ============================================================================
// STEREO BALANCE
// ============================================================================

/// Attenuates the channel opposite the balance direction
#[derive(Debug, Clone, Default)]
pub struct StereoBalance;

impl StereoBalance {
    pub fn new() -> Self {
        Self
    }

    /// `(left, right)` gains for a balance in -1..1
    pub fn gains(balance: f32) -> (f32, f32) {
        if balance > 0.0 {
            (1.0 - balance, 1.0)
        } else {
            (1.0, 1.0 + balance)
        }
    }
}

impl Stage for StereoBalance {
    fn is_active(&self, params: &EffectParameters, layout: ChannelLayout) -> bool {
        layout.is_stereo() && params.stereo_balance().abs() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], _layout: ChannelLayout, params: &EffectParameters) {
        let (gain_l, gain_r) = Self::gains(params.stereo_balance());

        for frame in buffer.chunks_exact_mut(2) {
            frame[0] *= gain_l;
            frame[1] *= gain_r;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "StereoBalance"
    }
}
