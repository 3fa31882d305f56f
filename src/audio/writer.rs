use std::path::Path;

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Writes mono buffers as WAV files
pub struct AudioWriter;

impl AudioWriter {
    /// Write `data` to `path` as a mono WAV with the given bit depth.
    ///
    /// 16 and 24 bit produce integer PCM, 32 bit produces IEEE float.
    pub fn write_wav(path: &Path, data: &AudioData, bit_depth: u16) -> Result<()> {
        let save_failed = |reason: String| AudioError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        let sample_format = match bit_depth {
            16 | 24 => hound::SampleFormat::Int,
            32 => hound::SampleFormat::Float,
            other => {
                return Err(AudioError::InvalidParameters {
                    details: format!("Unsupported WAV bit depth: {}", other),
                }.into())
            }
        };

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: data.sample_rate,
            bits_per_sample: bit_depth,
            sample_format,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .map_err(|e| save_failed(e.to_string()))?;

        for &sample in &data.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let written = match bit_depth {
                16 => writer.write_sample((clamped * i16::MAX as f32).round() as i16),
                24 => writer.write_sample((clamped * 8_388_607.0).round() as i32),
                _ => writer.write_sample(clamped),
            };
            written.map_err(|e| save_failed(e.to_string()))?;
        }

        writer.finalize().map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioLoader;
    use tempfile::tempdir;

    #[test]
    fn test_written_file_keeps_rate_and_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let data = AudioData::new((0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect(), 16000);

        AudioWriter::write_wav(&path, &data, 16).unwrap();
        let loaded = AudioLoader::load_blocking(&path).unwrap();

        assert_eq!(loaded.sample_rate, 16000);
        assert_eq!(loaded.len(), 1000);
        for (a, b) in data.samples.iter().zip(&loaded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_float_wav_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let data = AudioData::new(vec![0.123, -0.456, 0.789], 44100);

        AudioWriter::write_wav(&path, &data, 32).unwrap();
        let loaded = AudioLoader::load_blocking(&path).unwrap();
        assert_eq!(loaded.samples, data.samples);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let data = AudioData::new(vec![0.0; 10], 8000);
        assert!(AudioWriter::write_wav(&path, &data, 12).is_err());
    }
}
