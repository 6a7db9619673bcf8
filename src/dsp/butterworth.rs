//! Butterworth Low-Pass Filter
//!
//! Digital Butterworth design via the bilinear transform with frequency
//! pre-warping, realized as cascaded second-order sections. The response
//! is that of the classic `butter(N, Wn)` transfer function, with the
//! numerical robustness of a biquad cascade.
//!
//! Filtering is a single forward pass from zero initial state, so the
//! output carries the filter's phase delay.

use std::f64::consts::PI;

use crate::engine::AudioClip;
use crate::error::{HeartestError, Result};

/// Order used by the conditioning pipeline
pub const DEFAULT_ORDER: usize = 6;

/// Highest order the designer accepts
pub const MAX_ORDER: usize = 12;

/// Exclusive upper bound for the normalized cutoff (fraction of Nyquist)
pub const MAX_CUTOFF: f64 = 0.5;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Second-order low-pass section for one conjugate pole pair
    ///
    /// `k` is the pre-warped analog cutoff, `q` the pole pair quality factor.
    fn low_pass_pair(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        BiquadCoeffs {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
        }
    }

    /// First-order low-pass section for the real pole of odd orders
    fn low_pass_real(k: f64) -> Self {
        let b0 = k / (1.0 + k);
        BiquadCoeffs {
            b0,
            b1: b0,
            b2: 0.0,
            a1: (k - 1.0) / (k + 1.0),
            a2: 0.0,
        }
    }

    /// Magnitude response at angular frequency `w` (radians/sample)
    fn magnitude(&self, w: f64) -> f64 {
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Biquad filter state for one section
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Process a single sample through the biquad filter
    /// Direct Form I implementation
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        // Shift delay line
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// A designed Butterworth low-pass filter
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    order: usize,
    cutoff: f64,
    sections: Vec<BiquadCoeffs>,
}

impl ButterworthLowPass {
    /// Design a low-pass filter of the given order
    ///
    /// # Arguments
    /// * `order` - Filter order, 1 to 12
    /// * `cutoff` - Cutoff as a fraction of the Nyquist rate, strictly inside (0, 0.5)
    ///
    /// # Errors
    /// * `InvalidParameter` - If the order or cutoff is out of range
    pub fn new(order: usize, cutoff: f64) -> Result<Self> {
        if order == 0 || order > MAX_ORDER {
            return Err(HeartestError::invalid_parameter(
                "order",
                order,
                format!("1 to {}", MAX_ORDER),
            ));
        }
        validate_cutoff(cutoff)?;

        // Pre-warp the cutoff for the bilinear transform
        let k = (PI * cutoff / 2.0).tan();

        let mut sections = Vec::with_capacity((order + 1) / 2);
        for pair in 1..=order / 2 {
            // Analog pole angle of the pair, measured from the positive real axis
            let theta = PI * (2 * pair + order - 1) as f64 / (2 * order) as f64;
            let q = -1.0 / (2.0 * theta.cos());
            sections.push(BiquadCoeffs::low_pass_pair(k, q));
        }
        if order % 2 == 1 {
            sections.push(BiquadCoeffs::low_pass_real(k));
        }

        Ok(Self {
            order,
            cutoff,
            sections,
        })
    }

    /// The sixth-order design used for heart sound denoising
    pub fn sixth_order(cutoff: f64) -> Result<Self> {
        Self::new(DEFAULT_ORDER, cutoff)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Gain of the filter at a frequency given as a fraction of Nyquist
    pub fn magnitude_at(&self, normalized_freq: f64) -> f64 {
        let w = PI * normalized_freq;
        self.sections.iter().map(|s| s.magnitude(w)).product()
    }

    /// Filter raw samples in a single forward pass
    pub fn filter_samples(&self, input: &[f32]) -> Vec<f32> {
        let mut states = vec![BiquadState::default(); self.sections.len()];

        input
            .iter()
            .map(|&x| {
                let mut y = x as f64;
                for (state, coeffs) in states.iter_mut().zip(&self.sections) {
                    y = state.process(y, coeffs);
                }
                y as f32
            })
            .collect()
    }

    /// Filter a clip, producing a new clip of equal length and rate
    pub fn apply(&self, clip: &AudioClip) -> AudioClip {
        clip.with_samples(self.filter_samples(clip.samples()))
    }
}

/// Low-pass a clip with the sixth-order Butterworth design
pub fn low_pass(clip: &AudioClip, cutoff: f64) -> Result<AudioClip> {
    Ok(ButterworthLowPass::sixth_order(cutoff)?.apply(clip))
}

fn validate_cutoff(cutoff: f64) -> Result<()> {
    if !cutoff.is_finite() || cutoff <= 0.0 || cutoff >= MAX_CUTOFF {
        return Err(HeartestError::invalid_parameter(
            "cutoff",
            cutoff,
            "a fraction of the Nyquist rate strictly between 0 and 0.5",
        ));
    }
    Ok(())
}
