//! Heartest - Phonocardiogram Capture and Case Logging
//!
//! Heartest collects one heart sound recording for each of the four
//! auscultation sites, cleans them up and keeps a log of patient cases.
//!
//! # Pipeline
//!
//! - `engine`: WAV decoding and encoding into mono clips
//! - `dsp`: gain, truncation, zoom and a 6th-order Butterworth low-pass
//! - `render`: waveform plots of the conditioned signal
//! - `records`: the upload directory and the JSON case log
//! - `notify`: case summaries sent by SMS
//! - `session`: the per-intake state tying the steps together

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod notify;
pub mod records;
pub mod render;
pub mod session;

pub use error::{HeartestError, Result};
