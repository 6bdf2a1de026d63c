//! Fixed-capacity circular delay lines
//!
//! Lines are allocated once, zero-filled, and never resized. Read and write
//! positions wrap with modulo arithmetic every sample. A line of capacity
//! `N` can serve any delay in `1..N`; longer delays would alias into samples
//! that have not been written yet, so delays are clamped into that range.

/// Circular buffer with a single write head and arbitrary read taps
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Box<[f32]>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a zeroed line able to serve delays up to `capacity - 1`
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay this line can serve without aliasing
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Read the sample pushed `delay` pushes ago
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Write a sample and advance the write head
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Feedback comb filter: `y[n] = x[n - d] + g * y[n - d]`
#[derive(Debug, Clone)]
pub struct CombFilter {
    line: DelayLine,
}

impl CombFilter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            line: DelayLine::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32, delay: usize, feedback: f32) -> f32 {
        let output = self.line.read(delay);
        self.line.push(input + output * feedback);
        output
    }

    pub fn max_delay(&self) -> usize {
        self.line.max_delay()
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }
}

/// Schroeder allpass diffuser with fixed gain
///
/// `w[n] = x[n] + g * w[n - d]`, `y[n] = w[n - d] - g * w[n]`, which has a
/// flat magnitude response.
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    line: DelayLine,
}

impl AllpassFilter {
    /// Feedback gain of every allpass section
    pub const GAIN: f32 = 0.5;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            line: DelayLine::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32, delay: usize) -> f32 {
        let delayed = self.line.read(delay);
        let w = input + delayed * Self::GAIN;
        self.line.push(w);
        delayed - w * Self::GAIN
    }

    pub fn max_delay(&self) -> usize {
        self.line.max_delay()
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }
}
