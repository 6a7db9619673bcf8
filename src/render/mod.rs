//! Visualization
//!
//! Static waveform plots for display and export.

mod waveform;

pub use waveform::{
    render_conditioned, render_span, render_waveform, WaveformPlot, DEFAULT_MAX_POINTS,
};
