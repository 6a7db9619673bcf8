//! Audio Engine Module
//!
//! Audio containers and WAV file I/O:
//! - Mono clip type
//! - Import/export and in-memory encoding

pub mod clip;
pub mod io;

pub use clip::{seconds_to_samples, AudioClip, RECORDING_SAMPLE_RATE};
pub use io::{decode_clip, encode_wav, generate_test_tone, read_clip, write_clip};
