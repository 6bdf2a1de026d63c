//! WSOLA tempo and pitch processor
//!
//! Time scaling uses waveform-similarity overlap-add: Hann-windowed frames of
//! `window` samples are taken from the input every `tempo / pitch` analysis
//! hops, nudged within `±search` frames to the position that best continues
//! the previous frame, and overlap-added at a fixed 50% synthesis hop. The
//! stretched stream is then read back through a linear-interpolating
//! resampler whose phase advances by the pitch ratio, which restores the
//! duration while shifting the pitch.
//!
//! All buffers are sized at construction; `process` never allocates.
//! `tempo = 1` with a unit pitch ratio bypasses the processor and copies the
//! input verbatim.

use super::MAX_CHANNELS;
use crate::domain::audio::ChannelLayout;
use std::f32::consts::PI;
use tracing::trace;

/// Ratios closer to one than this are treated as unity
const UNITY_TOLERANCE: f32 = 1e-4;

/// Frames moved through one [`TimeStretcher::process`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StretchOutcome {
    /// Input frames taken into the processor
    pub consumed: usize,
    /// Output frames written
    pub produced: usize,
}

#[derive(Debug, Clone)]
pub struct TimeStretcher {
    window: usize,
    hop: usize,
    search: usize,
    hann: Box<[f32]>,
    channels: usize,

    input: Box<[f32]>,
    input_capacity: usize,
    input_frames: usize,
    analysis_pos: f64,
    /// Start of the natural continuation of the last frame taken
    template: Option<usize>,

    overlap: Box<[f32]>,

    stretched: Box<[f32]>,
    stretched_capacity: usize,
    stretched_frames: usize,
    phase: f64,

    engaged: bool,
}

impl TimeStretcher {
    pub const DEFAULT_WINDOW: usize = 1024;
    pub const MIN_WINDOW: usize = 64;

    /// Create a processor with a `window`-frame analysis window
    ///
    /// The window is rounded up to an even length of at least
    /// [`Self::MIN_WINDOW`]; the search radius is an eighth of it.
    pub fn new(window: usize) -> Self {
        let window = window.max(Self::MIN_WINDOW).next_multiple_of(2);
        let hop = window / 2;
        let search = window / 8;
        // Largest analysis hop is 4 synthesis hops (tempo 2, pitch -12)
        let input_capacity = window * 5 + search * 2;
        let stretched_capacity = window * 2;

        let hann = (0..window)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / window as f32).cos())
            .collect();

        Self {
            window,
            hop,
            search,
            hann,
            channels: 1,
            input: vec![0.0; input_capacity * MAX_CHANNELS].into_boxed_slice(),
            input_capacity,
            input_frames: 0,
            analysis_pos: 0.0,
            template: None,
            overlap: vec![0.0; window * MAX_CHANNELS].into_boxed_slice(),
            stretched: vec![0.0; stretched_capacity * MAX_CHANNELS].into_boxed_slice(),
            stretched_capacity,
            stretched_frames: 0,
            phase: 0.0,
            engaged: false,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Frames held back inside the processor before output starts
    pub fn latency_frames(&self) -> usize {
        self.window + self.search
    }

    /// Whether the processor currently holds stretched state
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn is_identity(tempo: f32, pitch_ratio: f32) -> bool {
        (tempo - 1.0).abs() < UNITY_TOLERANCE && (pitch_ratio - 1.0).abs() < UNITY_TOLERANCE
    }

    /// Stretch interleaved `input` into `output`
    ///
    /// Consumes as much input as the internal buffers can take and writes
    /// as much output as is ready. Callers feed any unconsumed remainder on
    /// the next call.
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        layout: ChannelLayout,
        tempo: f32,
        pitch_ratio: f32,
    ) -> StretchOutcome {
        let channels = layout.count();
        let in_frames = input.len() / channels;
        let out_frames = output.len() / channels;

        if Self::is_identity(tempo, pitch_ratio) {
            if self.engaged {
                self.reset();
            }
            let frames = in_frames.min(out_frames);
            output[..frames * channels].copy_from_slice(&input[..frames * channels]);
            return StretchOutcome {
                consumed: frames,
                produced: frames,
            };
        }

        if channels != self.channels {
            self.reset();
            self.channels = channels;
        }
        self.engaged = true;

        let analysis_hop = self.hop as f64 * tempo as f64 / pitch_ratio as f64;
        let mut outcome = StretchOutcome::default();

        loop {
            let mut progressed = false;

            let take = (self.input_capacity - self.input_frames).min(in_frames - outcome.consumed);
            if take > 0 {
                let src = &input[outcome.consumed * channels..(outcome.consumed + take) * channels];
                let dst_start = self.input_frames * channels;
                self.input[dst_start..dst_start + src.len()].copy_from_slice(src);
                self.input_frames += take;
                outcome.consumed += take;
                progressed = true;
            }

            while self.can_synthesize() {
                self.synthesize(analysis_hop);
                progressed = true;
            }

            let written = self.resample(
                &mut output[outcome.produced * channels..out_frames * channels],
                pitch_ratio as f64,
            );
            if written > 0 {
                outcome.produced += written;
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        outcome
    }

    /// Drop all buffered audio
    pub fn reset(&mut self) {
        self.input.fill(0.0);
        self.input_frames = 0;
        self.analysis_pos = 0.0;
        self.template = None;
        self.overlap.fill(0.0);
        self.stretched.fill(0.0);
        self.stretched_frames = 0;
        self.phase = 0.0;
        if self.engaged {
            trace!("Time stretcher reset");
        }
        self.engaged = false;
    }

    fn can_synthesize(&self) -> bool {
        let nominal = self.analysis_pos.round() as usize;
        self.stretched_frames + self.hop <= self.stretched_capacity
            && nominal + self.search + self.window <= self.input_frames
    }

    #[inline]
    fn mono(&self, frame: usize) -> f32 {
        let c = self.channels;
        self.input[frame * c..frame * c + c].iter().sum()
    }

    /// Candidate start around `nominal` most similar to `template`
    fn best_start(&self, template: usize, nominal: usize) -> usize {
        let overlap_len = self.window - self.hop;
        let lo = nominal.saturating_sub(self.search);
        let hi = nominal + self.search;

        let mut best = nominal;
        let mut best_score = f32::NEG_INFINITY;
        for candidate in lo..=hi {
            let mut corr = 0.0;
            let mut energy = 0.0;
            for i in 0..overlap_len {
                let x = self.mono(candidate + i);
                corr += self.mono(template + i) * x;
                energy += x * x;
            }
            let score = corr / (energy.sqrt() + 1e-9);
            if score > best_score {
                best_score = score;
                best = candidate;
            }
        }
        best
    }

    fn synthesize(&mut self, analysis_hop: f64) {
        let c = self.channels;
        let nominal = self.analysis_pos.round() as usize;
        let start = match self.template {
            Some(template) => self.best_start(template, nominal),
            None => nominal,
        };

        for i in 0..self.window {
            let w = self.hann[i];
            let src = (start + i) * c;
            for ch in 0..c {
                self.overlap[i * c + ch] += self.input[src + ch] * w;
            }
        }

        let hop_len = self.hop * c;
        let dst = self.stretched_frames * c;
        self.stretched[dst..dst + hop_len].copy_from_slice(&self.overlap[..hop_len]);
        self.stretched_frames += self.hop;
        self.overlap.copy_within(hop_len..self.window * c, 0);
        self.overlap[(self.window - self.hop) * c..self.window * c].fill(0.0);

        let template = start + self.hop;
        self.analysis_pos += analysis_hop;

        // Keep the template and every candidate of the next frame
        let next = self.analysis_pos.round() as usize;
        let drop = template.min(next.saturating_sub(self.search));
        self.input.copy_within(drop * c..self.input_frames * c, 0);
        self.input_frames -= drop;
        self.analysis_pos -= drop as f64;
        self.template = Some(template - drop);
    }

    fn resample(&mut self, output: &mut [f32], step: f64) -> usize {
        let c = self.channels;
        let mut written = 0;

        for frame in output.chunks_exact_mut(c) {
            let index = self.phase.floor() as usize;
            if index + 1 >= self.stretched_frames {
                break;
            }
            let frac = (self.phase - index as f64) as f32;
            for (ch, out) in frame.iter_mut().enumerate() {
                let a = self.stretched[index * c + ch];
                let b = self.stretched[(index + 1) * c + ch];
                *out = a + (b - a) * frac;
            }
            self.phase += step;
            written += 1;
        }

        let drop = (self.phase.floor() as usize).min(self.stretched_frames);
        if drop > 0 {
            self.stretched.copy_within(drop * c..self.stretched_frames * c, 0);
            self.stretched_frames -= drop;
            self.phase -= drop as f64;
        }

        written
    }
}

impl Default for TimeStretcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
