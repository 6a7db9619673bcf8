//! Audio file I/O for Heartest
//!
//! Reads PCM or float WAV files of any channel count and keeps only the
//! first channel. Writes mono 16-bit signed PCM, the format stethoscope
//! recordings and browser playback both accept.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::clip::AudioClip;
use crate::error::{HeartestError, Result};

/// Bit depth of every file Heartest writes
pub const EXPORT_BIT_DEPTH: u16 = 16;

/// Read a WAV file into a mono clip
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the bit depth cannot be decoded
/// * `EmptyAudio` - If the file holds no samples
pub fn read_clip(path: &Path) -> Result<AudioClip> {
    if !path.exists() {
        return Err(HeartestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| HeartestError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    })?;

    clip_from_reader(reader)
}

/// Decode WAV bytes held in memory (an upload body, for instance)
pub fn decode_clip(bytes: &[u8]) -> Result<AudioClip> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| HeartestError::InvalidAudio {
        reason: format!("Failed to parse WAV data: {}", e),
        source: Some(Box::new(e)),
    })?;

    clip_from_reader(reader)
}

/// Write a clip to disk as mono 16-bit PCM
pub fn write_clip(clip: &AudioClip, path: &Path) -> Result<()> {
    let writer = WavWriter::create(path, export_spec(clip)).map_err(wav_write_error)?;
    write_samples(writer, clip)
}

/// Encode a clip as an in-memory WAV file, ready for playback
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let writer = WavWriter::new(&mut cursor, export_spec(clip)).map_err(wav_write_error)?;
        write_samples(writer, clip)?;
    }
    Ok(cursor.into_inner())
}

/// Generate a test tone (sine wave)
///
/// Creates a mono clip containing a sine wave at the specified frequency.
pub fn generate_test_tone(
    frequency: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Result<AudioClip> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();

    AudioClip::new(sample_rate, samples)
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn export_spec(clip: &AudioClip) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate(),
        bits_per_sample: EXPORT_BIT_DEPTH,
        sample_format: SampleFormat::Int,
    }
}

fn wav_write_error(e: hound::Error) -> HeartestError {
    match e {
        hound::Error::IoError(io) => HeartestError::Io(io),
        other => HeartestError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

fn write_samples<W: Write + Seek>(mut writer: WavWriter<W>, clip: &AudioClip) -> Result<()> {
    for &sample in clip.samples() {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(scaled).map_err(wav_write_error)?;
    }
    writer.finalize().map_err(wav_write_error)
}

fn clip_from_reader<R: Read>(reader: WavReader<R>) -> Result<AudioClip> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    let first_channel: Vec<f32> = interleaved.into_iter().step_by(channels).collect();
    if first_channel.is_empty() {
        return Err(HeartestError::EmptyAudio);
    }

    if channels > 1 {
        log::debug!("Reduced {}-channel audio to its first channel", channels);
    }

    AudioClip::new(spec.sample_rate, first_channel)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    fn invalid(bits: &str, e: hound::Error) -> HeartestError {
        HeartestError::InvalidAudio {
            reason: format!("Failed to read {} samples: {}", bits, e),
            source: Some(Box::new(e)),
        }
    }

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(HeartestError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_test_tone() {
        let clip = generate_test_tone(50.0, 1.0, 4000).unwrap();

        assert_eq!(clip.len(), 4000);
        assert_eq!(clip.sample_rate(), 4000);

        // Half a cycle at 50 Hz is 40 samples
        assert!(clip.samples()[40].abs() < 0.01);
        assert!((clip.samples()[20] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_round_trip_preserves_length_and_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Mitral_tone.wav");

        let original = generate_test_tone(120.0, 0.5, 8000).unwrap();
        write_clip(&original, &path).unwrap();
        let imported = read_clip(&path).unwrap();

        assert_eq!(imported.len(), original.len());
        assert_eq!(imported.sample_rate(), original.sample_rate());

        for (orig, imp) in original.samples().iter().zip(imported.samples()) {
            assert!(
                (orig - imp).abs() < 0.001,
                "Sample mismatch: {} vs {}",
                orig,
                imp
            );
        }
    }

    #[test]
    fn test_encode_then_decode_in_memory() {
        let original = generate_test_tone(80.0, 0.25, 2000).unwrap();
        let bytes = encode_wav(&original).unwrap();

        assert_eq!(&bytes[..4], b"RIFF");
        let decoded = decode_clip(&bytes).unwrap();
        assert_eq!(decoded.len(), original.len());
        assert_eq!(decoded.sample_rate(), 2000);
    }

    #[test]
    fn test_stereo_reduced_to_first_channel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..100 {
            writer.write_sample(i as i16 * 10).unwrap();
            writer.write_sample(-1000_i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = read_clip(&path).unwrap();
        assert_eq!(clip.len(), 100);
        assert!(clip.samples().iter().all(|s| *s >= 0.0));
        assert!((clip.samples()[5] - 50.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_export_clamps_out_of_range_samples() {
        let clip = AudioClip::new(1000, vec![3.0, -3.0, 0.0]).unwrap();
        let decoded = decode_clip(&encode_wav(&clip).unwrap()).unwrap();
        assert!((decoded.samples()[0] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(decoded.samples()[1], -1.0);
    }

    #[test]
    fn test_read_nonexistent_file() {
        let result = read_clip(Path::new("/nonexistent/path/Aortic_a.wav"));

        match result.unwrap_err() {
            HeartestError::FileNotFound { path } => {
                assert!(path.to_string_lossy().contains("nonexistent"));
            }
            other => panic!("Expected FileNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_is_invalid_audio() {
        let err = decode_clip(b"definitely not a wav file").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }

    #[test]
    fn test_empty_wav_rejected() {
        let clip = AudioClip::new(1000, Vec::new()).unwrap();
        let bytes = encode_wav(&clip).unwrap();
        assert!(matches!(decode_clip(&bytes), Err(HeartestError::EmptyAudio)));
    }
}
