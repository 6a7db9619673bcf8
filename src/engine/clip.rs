//! Audio Clip
//!
//! The mono sample container that flows through the whole pipeline.
//! Clips are never modified in place: every transform returns a new clip.

use crate::error::{HeartestError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used for microphone recordings
pub const RECORDING_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a time in seconds to a sample index at the given rate
///
/// Truncates toward zero, matching `int(seconds * sr)`.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * sample_rate as f64) as usize
    }
}

// ============================================================================
// AudioClip
// ============================================================================

/// Mono audio with its sample rate
///
/// Samples are 32-bit float normalized to [-1.0, 1.0] on import. Gain
/// can push them beyond that range; they are clamped only on export.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioClip {
    /// Create a new clip
    ///
    /// # Errors
    /// * `InvalidParameter` - If the sample rate is zero
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(HeartestError::invalid_parameter(
                "sample_rate",
                sample_rate,
                "a positive rate in Hz",
            ));
        }
        Ok(Self {
            sample_rate,
            samples,
        })
    }

    /// Build a sibling clip with the same sample rate
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            sample_rate: self.sample_rate,
            samples,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Borrow the samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the clip and return its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the clip holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Keep only the first `seconds` of audio
    ///
    /// Durations past the end keep the whole clip.
    pub fn truncated(&self, seconds: f64) -> Self {
        let end = seconds_to_samples(seconds, self.sample_rate).min(self.samples.len());
        self.with_samples(self.samples[..end].to_vec())
    }

    /// Multiply every sample by a linear gain factor
    pub fn scaled(&self, gain: f32) -> Self {
        self.with_samples(self.samples.iter().map(|s| s * gain).collect())
    }

    /// Extract the samples between `start_secs` and `end_secs`
    ///
    /// Bounds are clamped to the clip; an inverted range yields an empty clip.
    pub fn window(&self, start_secs: f64, end_secs: f64) -> Self {
        let len = self.samples.len();
        let start = seconds_to_samples(start_secs, self.sample_rate).min(len);
        let end = seconds_to_samples(end_secs, self.sample_rate).min(len);
        if end <= start {
            return self.with_samples(Vec::new());
        }
        self.with_samples(self.samples[start..end].to_vec())
    }

    /// True when no sample is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
    }
}

// ============================================================================
// Tests
// ============================================================================
