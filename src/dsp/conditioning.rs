//! Signal conditioning
//!
//! Truncate, scale, low-pass and optionally zoom a recording. One pass
//! per interaction; nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::dsp::butterworth::ButterworthLowPass;
use crate::engine::AudioClip;
use crate::error::{HeartestError, Result};

/// Default amplitude factor
pub const DEFAULT_GAIN: f32 = 1.0;

/// Default analysis duration in seconds
pub const DEFAULT_DURATION_SECS: f64 = 5.0;

/// Default low-pass cutoff (fraction of Nyquist)
pub const DEFAULT_CUTOFF: f64 = 0.05;

/// Tolerance when comparing a requested duration to the clip length
const DURATION_EPSILON: f64 = 1e-9;

/// Per-interaction conditioning settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    /// Linear amplitude factor, must be positive
    pub gain: f32,
    /// Seconds of audio kept from the start of the clip
    pub duration_secs: f64,
    /// Low-pass cutoff as a fraction of the Nyquist rate
    pub cutoff: f64,
    /// Optional (start, end) window in seconds within the kept duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<(f64, f64)>,
}

impl FilterParameters {
    pub fn new(gain: f32, duration_secs: f64, cutoff: f64) -> Self {
        Self {
            gain,
            duration_secs,
            cutoff,
            zoom: None,
        }
    }

    /// Restrict the rendered view to `start..end` seconds
    pub fn with_zoom(mut self, start_secs: f64, end_secs: f64) -> Self {
        self.zoom = Some((start_secs, end_secs));
        self
    }

    /// Defaults sized for a given clip
    ///
    /// The duration is the default five seconds, shortened to the clip when
    /// the recording is shorter.
    pub fn defaults_for(clip: &AudioClip) -> Self {
        Self::new(
            DEFAULT_GAIN,
            DEFAULT_DURATION_SECS.min(clip.duration_secs()),
            DEFAULT_CUTOFF,
        )
    }

    /// Check the parameters against the clip they will be applied to
    pub fn validate(&self, clip: &AudioClip) -> Result<()> {
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(HeartestError::invalid_parameter(
                "gain",
                self.gain,
                "a positive amplitude factor",
            ));
        }

        let clip_secs = clip.duration_secs();
        if !self.duration_secs.is_finite()
            || self.duration_secs <= 0.0
            || self.duration_secs > clip_secs + DURATION_EPSILON
        {
            return Err(HeartestError::invalid_parameter(
                "duration_secs",
                self.duration_secs,
                format!("greater than 0 and at most {:.3} s", clip_secs),
            ));
        }

        if let Some((start, end)) = self.zoom {
            let in_range = start.is_finite()
                && end.is_finite()
                && start >= 0.0
                && start < end
                && end <= self.duration_secs + DURATION_EPSILON;
            if !in_range {
                return Err(HeartestError::invalid_parameter(
                    "zoom",
                    format!("{}..{}", start, end),
                    format!("0 <= start < end <= {}", self.duration_secs),
                ));
            }
        }

        // The filter design validates the cutoff itself
        ButterworthLowPass::sixth_order(self.cutoff).map(|_| ())
    }
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self::new(DEFAULT_GAIN, DEFAULT_DURATION_SECS, DEFAULT_CUTOFF)
    }
}

/// Output of one conditioning pass
#[derive(Debug, Clone)]
pub struct Conditioned {
    /// Truncated, scaled and filtered audio
    pub filtered: AudioClip,
    /// The part of `filtered` selected by the zoom window
    pub view: AudioClip,
    /// Start of `view` in seconds
    pub view_start_secs: f64,
    /// End of `view` in seconds
    pub view_end_secs: f64,
}

/// Run the conditioning pipeline: truncate, scale, filter, zoom
pub fn condition(clip: &AudioClip, params: &FilterParameters) -> Result<Conditioned> {
    params.validate(clip)?;

    let filter = ButterworthLowPass::sixth_order(params.cutoff)?;
    let adjusted = clip.truncated(params.duration_secs).scaled(params.gain);
    let filtered = filter.apply(&adjusted);

    let (view_start_secs, view_end_secs) = params.zoom.unwrap_or((0.0, params.duration_secs));
    let view = filtered.window(view_start_secs, view_end_secs);

    log::debug!(
        "Conditioned {} samples (gain {}, cutoff {}), view {:.2}-{:.2}s",
        filtered.len(),
        params.gain,
        params.cutoff,
        view_start_secs,
        view_end_secs
    );

    Ok(Conditioned {
        filtered,
        view,
        view_start_secs,
        view_end_secs,
    })
}
