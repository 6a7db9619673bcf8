//! CLI Module
//!
//! Command-line interface for the Heartest PCG workflow. Each invocation
//! is one interaction: upload, analyze, save, review or notify.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::{FilterParameters, DEFAULT_CUTOFF, DEFAULT_GAIN};
use crate::engine::AudioClip;

/// Heartest - phonocardiogram capture, denoising and case log
#[derive(Parser, Debug)]
#[command(name = "heartest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Upload directory (overrides HEARTEST_UPLOAD_DIR)
    #[arg(long, global = true)]
    pub upload_dir: Option<PathBuf>,

    /// Case log file (overrides HEARTEST_STORE)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Conditioning controls shared by commands that render audio
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Amplitude factor
    #[arg(long, default_value_t = DEFAULT_GAIN)]
    pub gain: f32,

    /// Seconds of audio to keep (defaults to 5 s or the whole clip if shorter)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Low-pass cutoff as a fraction of Nyquist, between 0 and 0.5
    #[arg(long, default_value_t = DEFAULT_CUTOFF)]
    pub cutoff: f64,

    /// Start of the zoom window in seconds
    #[arg(long, requires = "zoom_end")]
    pub zoom_start: Option<f64>,

    /// End of the zoom window in seconds
    #[arg(long, requires = "zoom_start")]
    pub zoom_end: Option<f64>,
}

impl FilterArgs {
    /// Turn the flags into parameters for a particular clip
    pub fn to_params(&self, clip: &AudioClip) -> FilterParameters {
        let duration = self
            .duration
            .unwrap_or_else(|| FilterParameters::defaults_for(clip).duration_secs);
        let params = FilterParameters::new(self.gain, duration, self.cutoff);

        match (self.zoom_start, self.zoom_end) {
            (Some(start), Some(end)) => params.with_zoom(start, end),
            _ => params,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a WAV recording for a valve site
    #[command(name = "upload")]
    Upload {
        /// Valve site: aortic, pulmonary, tricuspid or mitral
        #[arg(long)]
        valve: String,

        /// WAV file to upload
        file: PathBuf,
    },

    /// Store a synthetic tone as a valve recording (for trying the pipeline)
    #[command(name = "record-tone")]
    RecordTone {
        /// Valve site: aortic, pulmonary, tricuspid or mitral
        #[arg(long)]
        valve: String,

        /// Tone frequency in Hz
        #[arg(long, default_value_t = 40.0)]
        frequency: f32,

        /// Length in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,

        /// Sample rate in Hz
        #[arg(long, default_value_t = crate::engine::RECORDING_SAMPLE_RATE)]
        rate: u32,
    },

    /// Denoise and plot a recording
    #[command(name = "analyze")]
    Analyze {
        /// Stored file name or path to a WAV file
        file: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Write the plot as SVG
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Write the filtered audio as WAV
        #[arg(long)]
        wav: Option<PathBuf>,

        /// Print the plot descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a patient case with all four valve recordings
    #[command(name = "save-case")]
    SaveCase {
        #[arg(long)]
        name: String,

        #[arg(long)]
        age: u32,

        /// male, female or other
        #[arg(long)]
        gender: Option<String>,

        #[arg(long, default_value = "")]
        notes: String,

        /// Height in centimetres
        #[arg(long)]
        height: Option<f64>,

        /// Weight in kilograms
        #[arg(long)]
        weight: Option<f64>,

        /// Aortic recording (stored name or WAV path)
        #[arg(long)]
        aortic: Option<String>,

        /// Pulmonary recording (stored name or WAV path)
        #[arg(long)]
        pulmonary: Option<String>,

        /// Tricuspid recording (stored name or WAV path)
        #[arg(long)]
        tricuspid: Option<String>,

        /// Mitral recording (stored name or WAV path)
        #[arg(long)]
        mitral: Option<String>,

        /// Text the case summary to this number after saving
        #[arg(long)]
        phone: Option<String>,
    },

    /// List saved cases, newest first
    #[command(name = "history")]
    History {
        /// Write a plot per recording into this directory
        #[arg(long)]
        plots_dir: Option<PathBuf>,
    },

    /// Text the summary of a saved case
    #[command(name = "send-sms")]
    SendSms {
        /// Destination number in international format
        #[arg(long)]
        phone: String,

        /// Case position in the history listing (0 = newest)
        #[arg(long, default_value_t = 0)]
        case: usize,
    },
}
