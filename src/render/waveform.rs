//! Waveform plots
//!
//! Turns samples into a time-vs-amplitude plot descriptor. The descriptor
//! is plain data: it serializes to JSON for a front end, or draws itself
//! as a standalone SVG document.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::dsp::Conditioned;
use crate::engine::AudioClip;

/// Point budget used when a caller does not pick one
pub const DEFAULT_MAX_POINTS: usize = 4000;

const X_LABEL: &str = "Time (s)";
const Y_LABEL: &str = "Amplitude";

/// Margin around the plot area in SVG pixels
const SVG_MARGIN: f64 = 48.0;

/// A renderable time-vs-amplitude plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformPlot {
    /// Title, usually the valve label
    pub label: String,
    pub x_label: String,
    pub y_label: String,
    /// (first, last) time in seconds
    pub x_range: (f64, f64),
    /// (min, max) amplitude among the plotted points
    pub y_range: (f64, f64),
    /// (time, amplitude) pairs in time order
    pub points: Vec<(f64, f64)>,
}

impl WaveformPlot {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Draw the plot as an SVG document
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let w = width.max(1) as f64;
        let h = height.max(1) as f64;
        let plot_w = (w - 2.0 * SVG_MARGIN).max(1.0);
        let plot_h = (h - 2.0 * SVG_MARGIN).max(1.0);

        let (x0, x1) = non_degenerate(self.x_range);
        let (y0, y1) = non_degenerate(self.y_range);

        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{}</text>"#,
            w / 2.0,
            SVG_MARGIN / 2.0,
            escape_xml(&self.label)
        );
        let _ = writeln!(
            svg,
            r#"<rect x="{m}" y="{m}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#,
            m = SVG_MARGIN
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
            w / 2.0,
            h - SVG_MARGIN / 4.0,
            escape_xml(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x}" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 {x} {y})">{}</text>"#,
            escape_xml(&self.y_label),
            x = SVG_MARGIN / 3.0,
            y = h / 2.0
        );

        if !self.points.is_empty() {
            let mut polyline = String::with_capacity(self.points.len() * 16);
            for &(t, a) in &self.points {
                let px = SVG_MARGIN + (t - x0) / (x1 - x0) * plot_w;
                let py = SVG_MARGIN + (1.0 - (a - y0) / (y1 - y0)) * plot_h;
                let _ = write!(polyline, "{:.2},{:.2} ", px, py);
            }
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="steelblue" stroke-width="1" points="{}"/>"#,
                polyline.trim_end()
            );
        }

        svg.push_str("</svg>\n");
        svg
    }
}

/// Plot a whole clip starting at t = 0
pub fn render_waveform(clip: &AudioClip, label: &str) -> WaveformPlot {
    let end = clip.duration_secs();
    render_span(clip.samples(), label, 0.0, end, DEFAULT_MAX_POINTS)
}

/// Plot the zoomed view of a conditioning pass
pub fn render_conditioned(conditioned: &Conditioned, label: &str) -> WaveformPlot {
    render_span(
        conditioned.view.samples(),
        label,
        conditioned.view_start_secs,
        conditioned.view_end_secs,
        DEFAULT_MAX_POINTS,
    )
}

/// Plot samples with times spaced linearly from `start_secs` to `end_secs`
///
/// When there are more samples than `max_points`, each bucket of samples
/// contributes its minimum and maximum so peaks survive the reduction.
pub fn render_span(
    samples: &[f32],
    label: &str,
    start_secs: f64,
    end_secs: f64,
    max_points: usize,
) -> WaveformPlot {
    let n = samples.len();
    let step = if n > 1 {
        (end_secs - start_secs) / (n - 1) as f64
    } else {
        0.0
    };
    let time_at = |i: usize| start_secs + i as f64 * step;

    let max_points = max_points.max(2);
    let points: Vec<(f64, f64)> = if n <= max_points {
        samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (time_at(i), s as f64))
            .collect()
    } else {
        let buckets = max_points / 2;
        let bucket_len = (n + buckets - 1) / buckets;
        let mut points = Vec::with_capacity(buckets * 2);

        for (b, chunk) in samples.chunks(bucket_len).enumerate() {
            let base = b * bucket_len;
            let (mut min_i, mut max_i) = (0, 0);
            for (i, &s) in chunk.iter().enumerate() {
                if s < chunk[min_i] {
                    min_i = i;
                }
                if s > chunk[max_i] {
                    max_i = i;
                }
            }
            let (first, second) = if min_i <= max_i {
                (min_i, max_i)
            } else {
                (max_i, min_i)
            };
            points.push((time_at(base + first), chunk[first] as f64));
            if second != first {
                points.push((time_at(base + second), chunk[second] as f64));
            }
        }
        points
    };

    let y_range = points.iter().fold(None, |acc: Option<(f64, f64)>, &(_, a)| {
        Some(match acc {
            Some((lo, hi)) => (lo.min(a), hi.max(a)),
            None => (a, a),
        })
    });

    WaveformPlot {
        label: label.to_string(),
        x_label: X_LABEL.to_string(),
        y_label: Y_LABEL.to_string(),
        x_range: (start_secs, end_secs),
        y_range: y_range.unwrap_or((0.0, 0.0)),
        points,
    }
}

fn non_degenerate((lo, hi): (f64, f64)) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_times_span_window() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0];
        let plot = render_span(&samples, "Aortic", 1.0, 2.0, 100);

        assert_eq!(plot.len(), 5);
        assert_relative_eq!(plot.points[0].0, 1.0);
        assert_relative_eq!(plot.points[4].0, 2.0);
        assert_relative_eq!(plot.points[2].0, 1.5);
        assert_eq!(plot.y_range, (0.0, 1.0));
        assert_eq!(plot.x_label, "Time (s)");
        assert_eq!(plot.y_label, "Amplitude");
    }

    #[test]
    fn test_whole_clip() {
        let clip = AudioClip::new(100, vec![0.1; 200]).unwrap();
        let plot = render_waveform(&clip, "Mitral");
        assert_eq!(plot.x_range, (0.0, 2.0));
        assert_eq!(plot.len(), 200);
    }

    #[test]
    fn test_decimation_keeps_extremes() {
        let mut samples = vec![0.0_f32; 10_000];
        samples[1234] = 0.9;
        samples[7777] = -0.8;

        let plot = render_span(&samples, "Pulmonary", 0.0, 10.0, 200);

        assert!(plot.len() <= 200);
        assert_relative_eq!(plot.y_range.1, 0.9, epsilon = 1e-6);
        assert_relative_eq!(plot.y_range.0, -0.8, epsilon = 1e-6);
        assert!(plot.points.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_empty_plot() {
        let plot = render_span(&[], "Tricuspid", 0.0, 0.0, 100);
        assert!(plot.is_empty());
        assert_eq!(plot.y_range, (0.0, 0.0));
        assert!(plot.to_svg(640, 480).contains("</svg>"));
    }

    #[test]
    fn test_svg_output() {
        let plot = render_span(&[0.0, 1.0, -1.0], "A & B", 0.0, 1.0, 100);
        let svg = plot.to_svg(640, 480);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("A &amp; B"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_serializes_to_json() {
        let plot = render_span(&[0.25], "Aortic", 0.0, 0.0, 10);
        let json = serde_json::to_value(&plot).unwrap();
        assert_eq!(json["label"], "Aortic");
        assert_eq!(json["points"][0][1], 0.25);
    }
}
