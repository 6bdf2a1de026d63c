//! Schroeder reverb
//!
//! A mono downmix feeds four parallel comb filters whose averaged output is
//! diffused by two series allpass sections, then blended back into every
//! channel. Delay lengths and decays come from a constant table keyed by
//! [`ReverbPreset`]; all six lines are sized once for the longest delay any
//! preset uses at the engine sample rate.

use super::delay::{AllpassFilter, CombFilter};
use super::{Stage, EFFECT_EPSILON};
use crate::domain::audio::ChannelLayout;
use crate::domain::params::{EffectParameters, ReverbPreset};
use tracing::trace;

/// Sample rate the tuning table is expressed in
const TUNING_SAMPLE_RATE: f32 = 44100.0;

/// Scale applied to the mono send so resonant combs keep headroom
const INPUT_GAIN: f32 = 0.3;

/// Comb and allpass tuning of one room model, in samples at 44.1 kHz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbTuning {
    /// `(delay, feedback)` of each parallel comb
    pub combs: [(usize, f32); 4],
    /// Delays of the two series allpass sections
    pub allpasses: [usize; 2],
}

impl ReverbTuning {
    /// Tuning for a preset, `None` for [`ReverbPreset::Off`]
    pub const fn for_preset(preset: ReverbPreset) -> Option<&'static ReverbTuning> {
        match preset {
            ReverbPreset::Off => None,
            ReverbPreset::SmallRoom => Some(&SMALL_ROOM),
            ReverbPreset::MediumRoom => Some(&MEDIUM_ROOM),
            ReverbPreset::LargeRoom => Some(&LARGE_ROOM),
            ReverbPreset::MediumHall => Some(&MEDIUM_HALL),
            ReverbPreset::LargeHall => Some(&LARGE_HALL),
            ReverbPreset::Plate => Some(&PLATE),
        }
    }

    /// Longest delay in samples at 44.1 kHz
    pub fn longest_delay(&self) -> usize {
        let comb = self.combs.iter().map(|&(d, _)| d).max().unwrap_or(0);
        let allpass = self.allpasses.iter().copied().max().unwrap_or(0);
        comb.max(allpass)
    }
}

const SMALL_ROOM: ReverbTuning = ReverbTuning {
    combs: [(557, 0.70), (617, 0.71), (677, 0.72), (743, 0.73)],
    allpasses: [225, 341],
};

const MEDIUM_ROOM: ReverbTuning = ReverbTuning {
    combs: [(887, 0.76), (953, 0.77), (1031, 0.77), (1109, 0.78)],
    allpasses: [341, 441],
};

const LARGE_ROOM: ReverbTuning = ReverbTuning {
    combs: [(1116, 0.81), (1188, 0.82), (1277, 0.82), (1356, 0.83)],
    allpasses: [441, 556],
};

const MEDIUM_HALL: ReverbTuning = ReverbTuning {
    combs: [(1422, 0.84), (1491, 0.85), (1557, 0.85), (1617, 0.86)],
    allpasses: [556, 441],
};

const LARGE_HALL: ReverbTuning = ReverbTuning {
    combs: [(1733, 0.88), (1867, 0.89), (1999, 0.89), (2137, 0.90)],
    allpasses: [579, 467],
};

const PLATE: ReverbTuning = ReverbTuning {
    combs: [(733, 0.90), (797, 0.90), (863, 0.91), (929, 0.91)],
    allpasses: [179, 269],
};

/// Four-comb, two-allpass reverb stage
#[derive(Debug, Clone)]
pub struct Reverb {
    scale: f32,
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
    active_preset: ReverbPreset,
    comb_delays: [usize; 4],
    comb_feedback: [f32; 4],
    allpass_delays: [usize; 2],
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let scale = sample_rate as f32 / TUNING_SAMPLE_RATE;
        let capacity = Self::required_capacity(sample_rate);
        Self {
            scale,
            combs: std::array::from_fn(|_| CombFilter::with_capacity(capacity)),
            allpasses: std::array::from_fn(|_| AllpassFilter::with_capacity(capacity)),
            active_preset: ReverbPreset::Off,
            comb_delays: [1; 4],
            comb_feedback: [0.0; 4],
            allpass_delays: [1; 2],
        }
    }

    /// Line capacity covering every preset's longest delay at `sample_rate`
    pub fn required_capacity(sample_rate: u32) -> usize {
        let scale = sample_rate as f32 / TUNING_SAMPLE_RATE;
        let longest = ReverbPreset::ALL
            .iter()
            .filter_map(|&p| ReverbTuning::for_preset(p))
            .map(ReverbTuning::longest_delay)
            .max()
            .unwrap_or(1);
        Self::scaled(longest, scale) + 1
    }

    /// Delay capacity of the smallest line
    pub fn max_delay(&self) -> usize {
        let comb = self.combs.iter().map(CombFilter::max_delay).min().unwrap_or(0);
        let allpass = self.allpasses.iter().map(AllpassFilter::max_delay).min().unwrap_or(0);
        comb.min(allpass)
    }

    fn scaled(delay: usize, scale: f32) -> usize {
        ((delay as f32 * scale).round() as usize).max(1)
    }

    fn select(&mut self, preset: ReverbPreset) {
        self.active_preset = preset;
        self.reset();
        if let Some(tuning) = ReverbTuning::for_preset(preset) {
            for (i, &(delay, feedback)) in tuning.combs.iter().enumerate() {
                self.comb_delays[i] = Self::scaled(delay, self.scale);
                self.comb_feedback[i] = feedback;
            }
            for (i, &delay) in tuning.allpasses.iter().enumerate() {
                self.allpass_delays[i] = Self::scaled(delay, self.scale);
            }
        }
        trace!("Reverb preset switched to {:?}", preset);
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let mut sum = 0.0;
        for i in 0..self.combs.len() {
            sum += self.combs[i].process(input, self.comb_delays[i], self.comb_feedback[i]);
        }
        let mut out = sum / self.combs.len() as f32;
        for i in 0..self.allpasses.len() {
            out = self.allpasses[i].process(out, self.allpass_delays[i]);
        }
        out
    }
}

impl Stage for Reverb {
    fn is_active(&self, params: &EffectParameters, _layout: ChannelLayout) -> bool {
        params.reverb_preset() != ReverbPreset::Off && params.reverb_wet_mix() > EFFECT_EPSILON
    }

    fn process(&mut self, buffer: &mut [f32], layout: ChannelLayout, params: &EffectParameters) {
        let preset = params.reverb_preset();
        if preset != self.active_preset {
            self.select(preset);
        }
        let wet = params.reverb_wet_mix();
        let dry = 1.0 - wet / 2.0;
        let channels = layout.count() as f32;

        for frame in buffer.chunks_exact_mut(layout.count()) {
            let mono = frame.iter().sum::<f32>() / channels;
            let reverb = self.tick(mono * INPUT_GAIN);
            frame.iter_mut().for_each(|s| *s = *s * dry + wet * reverb);
        }
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }

    fn name(&self) -> &str {
        "Reverb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_fits_capacity() {
        for &rate in &[22050, 44100, 48000, 96000, 192000] {
            let reverb = Reverb::new(rate);
            let scale = rate as f32 / TUNING_SAMPLE_RATE;
            for preset in ReverbPreset::ALL {
                if let Some(tuning) = ReverbTuning::for_preset(preset) {
                    let longest = Reverb::scaled(tuning.longest_delay(), scale);
                    assert!(
                        longest <= reverb.max_delay(),
                        "{:?} at {} Hz needs {} > {}",
                        preset,
                        rate,
                        longest,
                        reverb.max_delay()
                    );
                }
            }
        }
    }

    #[test]
    fn test_presets_are_distinct() {
        let tunings: Vec<_> = ReverbPreset::ALL
            .iter()
            .filter_map(|&p| ReverbTuning::for_preset(p))
            .collect();
        assert_eq!(tunings.len(), 6);
        for (i, a) in tunings.iter().enumerate() {
            for b in &tunings[i + 1..] {
                assert_ne!(a, b);
            }
            assert!(a.combs.iter().all(|&(_, fb)| fb > 0.0 && fb < 1.0));
        }
    }

    #[test]
    fn test_impulse_produces_tail() {
        let params = EffectParameters::new();
        params.set_reverb(ReverbPreset::SmallRoom, 1.0);
        let mut reverb = Reverb::new(44100);

        let mut buffer = vec![0.0; 4410];
        buffer[0] = 1.0;
        reverb.process(&mut buffer, ChannelLayout::Mono, &params);

        // Nothing arrives before the shortest comb delay
        assert!(buffer[1..557].iter().all(|&s| s == 0.0));
        assert!(buffer[557..].iter().any(|&s| s.abs() > 1e-4));
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let params = EffectParameters::new();
        params.set_reverb(ReverbPreset::Plate, 1.0);

        let input: Vec<f32> = (0..2048).map(|i| ((i * 37 % 101) as f32 / 50.0) - 1.0).collect();
        let run = || {
            let mut reverb = Reverb::new(48000);
            let mut out = Vec::new();
            for chunk in input.chunks(256) {
                let mut block = chunk.to_vec();
                reverb.process(&mut block, ChannelLayout::Stereo, &params);
                out.extend(block);
            }
            out
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_inactive_without_preset_or_wet() {
        let params = EffectParameters::new();
        let reverb = Reverb::new(48000);
        params.set_reverb(ReverbPreset::LargeHall, 0.0);
        assert!(!reverb.is_active(&params, ChannelLayout::Stereo));
        params.set_reverb(ReverbPreset::Off, 1.0);
        assert!(!reverb.is_active(&params, ChannelLayout::Stereo));
        params.set_reverb(ReverbPreset::LargeHall, 0.5);
        assert!(reverb.is_active(&params, ChannelLayout::Stereo));
    }

    #[test]
    fn test_preset_change_clears_tail() {
        let params = EffectParameters::new();
        params.set_reverb(ReverbPreset::LargeHall, 1.0);
        let mut reverb = Reverb::new(44100);

        let mut loud = vec![0.5; 1024];
        reverb.process(&mut loud, ChannelLayout::Mono, &params);

        params.set_reverb(ReverbPreset::SmallRoom, 1.0);
        let mut silence = vec![0.0; 256];
        reverb.process(&mut silence, ChannelLayout::Mono, &params);
        assert!(silence.iter().all(|&s| s == 0.0));
    }
}
