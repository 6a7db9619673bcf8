//! Signal conditioning for heart sound recordings
//!
//! Amplitude scaling, duration truncation and Butterworth low-pass
//! denoising. Every operation returns a new clip.

mod butterworth;
mod conditioning;

pub use butterworth::{low_pass, ButterworthLowPass, DEFAULT_ORDER, MAX_CUTOFF, MAX_ORDER};
pub use conditioning::{
    condition, Conditioned, FilterParameters, DEFAULT_CUTOFF, DEFAULT_DURATION_SECS, DEFAULT_GAIN,
};
