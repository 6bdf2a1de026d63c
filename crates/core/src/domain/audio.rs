//! Audio buffer abstractions and domain errors
//!
//! Buffers handed to the engine are interleaved `f32` samples laid out as
//! `frame * channel_count + channel`, nominally normalized to [-1.0, 1.0].
//! This module validates that layout and hosts the small conversion helpers
//! shared by every effect stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when a host hands the engine a render block
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// The engine has not been created, or has already been destroyed
    #[error("Engine is not initialized")]
    NotInitialized,

    /// The host passed an empty sample buffer
    #[error("Empty buffer")]
    EmptyBuffer,

    /// Frame count must be strictly positive
    #[error("Invalid frame count: {0}")]
    InvalidFrameCount(i64),

    /// Only mono and stereo blocks are supported
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(i64),

    /// The buffer holds fewer samples than `frames * channels`
    #[error("Buffer too short: expected {expected} samples, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    /// Invalid configuration for the engine
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Channel layout of an interleaved block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    /// Map a raw channel count onto a supported layout
    pub fn from_count(count: i32) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    pub fn is_stereo(&self) -> bool {
        matches!(self, ChannelLayout::Stereo)
    }
}

/// Validate a render block and return its layout
///
/// Only the first `num_frames * channel_count` samples are processed; a
/// longer buffer is accepted so hosts can reuse oversized scratch arrays.
pub fn validate_block(buffer: &[f32], num_frames: i32, channel_count: i32) -> Result<ChannelLayout> {
    if buffer.is_empty() {
        return Err(AudioError::EmptyBuffer);
    }
    if num_frames <= 0 {
        return Err(AudioError::InvalidFrameCount(i64::from(num_frames)));
    }
    let layout = ChannelLayout::from_count(channel_count)
        .ok_or(AudioError::UnsupportedChannelCount(i64::from(channel_count)))?;

    let expected = num_frames as usize * layout.count();
    if buffer.len() < expected {
        return Err(AudioError::BufferTooShort {
            expected,
            actual: buffer.len(),
        });
    }

    Ok(layout)
}

/// Convert decibels to a linear gain factor (`10^(dB/20)`)
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear gain factor to decibels, floored at -120 dB
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 1e-6 {
        -120.0
    } else {
        20.0 * gain.log10()
    }
}

/// Convert a semitone offset to a frequency ratio (`2^(n/12)`)
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}
