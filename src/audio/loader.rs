use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::task;
use tracing::{debug, warn};

use crate::audio::types::{mix_to_mono, AudioData};
use crate::error::{AudioError, Result};
use crate::output::extension_of;

/// Audio file loader supporting multiple formats.
///
/// Every file is mixed down to mono at its native sample rate.
pub struct AudioLoader;

impl AudioLoader {
    /// Load an audio file and return its mono samples
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<AudioData> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let display = path.display().to_string();

        task::spawn_blocking(move || Self::load_blocking(&path))
            .await
            .map_err(|_| AudioError::LoadFailed { path: display })?
    }

    /// Synchronous variant of [`AudioLoader::load`]
    pub fn load_blocking(path: &Path) -> Result<AudioData> {
        let extension = extension_of(path).unwrap_or_default();

        let data = match extension.as_str() {
            "wav" => Self::load_wav(path)?,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::load_with_symphonia(path)?,
            _ => {
                return Err(AudioError::UnsupportedFormat {
                    format: extension
                }.into())
            }
        };

        debug!(
            "Loaded {:?}: {:.2}s at {} Hz",
            path,
            data.duration(),
            data.sample_rate
        );
        Ok(data)
    }

    /// Load WAV files using the hound crate
    fn load_wav(path: &Path) -> Result<AudioData> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string()
        };

        let reader = hound::WavReader::open(path).map_err(|_| load_failed())?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| load_failed())?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| load_failed())?
                    .into_iter()
                    .map(|sample| Self::int_to_float(sample, bit_depth))
                    .collect()
            }
        };

        Ok(AudioData::new(
            mix_to_mono(&samples, spec.channels),
            spec.sample_rate,
        ))
    }

    /// Load compressed formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<AudioData> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string()
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|_| load_failed())?;

        let mut format = probed.format;

        // First track with a decodable codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params.sample_rate
            .ok_or_else(|| AudioError::InvalidParameters {
                details: "No sample rate found".to_string()
            })?;

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &dec_opts)
            .map_err(|_| load_failed())?;

        let mut interleaved = Vec::new();
        let mut channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    warn!("Stopping decode of {:?}: {}", path, e);
                    break;
                }
            };

            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count() as u16;

                    let needs_new = sample_buf
                        .as_ref()
                        .map(|buf| buf.capacity() < decoded.capacity() * spec.channels.count())
                        .unwrap_or(true);
                    if needs_new {
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }

                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        interleaved.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(_) => break,
            }
        }

        if interleaved.is_empty() {
            return Err(load_failed().into());
        }

        Ok(AudioData::new(mix_to_mono(&interleaved, channels), sample_rate))
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Check if a file extension can be decoded
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}
