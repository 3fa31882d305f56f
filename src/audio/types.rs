use std::path::{Path, PathBuf};

use crate::output::base_name;

/// Decoded mono audio signal.
///
/// The sample rate is fixed when the buffer is created and carried unchanged
/// through every transform; only the number of samples changes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Buffer of `duration` seconds of silence
    pub fn silence(duration: f64, sample_rate: u32) -> Self {
        let len = (duration.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample index for a time in seconds (truncating, like `int(t * sr)`)
    pub fn index_for_time(&self, time: f64) -> usize {
        (time.max(0.0) * self.sample_rate as f64) as usize
    }

    /// Get time in seconds for a sample index
    pub fn time_for_sample(&self, sample_index: usize) -> f64 {
        sample_index as f64 / self.sample_rate as f64
    }

    /// Root mean square amplitude
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Convert to another sample rate by linear interpolation
    pub fn resampled(&self, sample_rate: u32) -> AudioData {
        if sample_rate == self.sample_rate || self.sample_rate == 0 {
            return self.clone();
        }
        let step = self.sample_rate as f64 / sample_rate as f64;
        let len = (self.len() as f64 / step).round() as usize;
        AudioData::new(interpolate(&self.samples, step, len), sample_rate)
    }

    /// Play back `factor` times faster without pitch correction
    pub fn varispeed(&self, factor: f64) -> AudioData {
        let len = (self.len() as f64 / factor).round() as usize;
        AudioData::new(interpolate(&self.samples, factor, len), self.sample_rate)
    }
}

/// Read `len` points from `samples` at positions `0, step, 2*step, ...`
fn interpolate(samples: &[f32], step: f64, len: usize) -> Vec<f32> {
    if samples.is_empty() {
        return vec![0.0; len];
    }
    let last = samples.len() - 1;
    (0..len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let frac = (pos - idx as f64).clamp(0.0, 1.0) as f32;
            let next = samples[(idx + 1).min(last)];
            samples[idx] * (1.0 - frac) + next * frac
        })
        .collect()
}

/// Root mean square of a sample slice (0.0 for an empty slice)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Average interleaved channels down to one
pub fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// An audio operation's input: a file still to be decoded, or a buffer
/// produced by an earlier step
#[derive(Debug, Clone)]
pub enum AudioInput {
    File(PathBuf),
    Buffer(AudioData),
}

impl AudioInput {
    /// Base name used for files derived from this input
    pub fn base_name(&self) -> String {
        match self {
            Self::File(path) => base_name(path, "audio"),
            Self::Buffer(_) => "audio".to_string(),
        }
    }
}

impl From<PathBuf> for AudioInput {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for AudioInput {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<&str> for AudioInput {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<String> for AudioInput {
    fn from(path: String) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<AudioData> for AudioInput {
    fn from(data: AudioData) -> Self {
        Self::Buffer(data)
    }
}

impl From<AudioOutput> for AudioInput {
    fn from(output: AudioOutput) -> Self {
        match output {
            AudioOutput::Saved(path) => Self::File(path),
            AudioOutput::Buffer(data) => Self::Buffer(data),
        }
    }
}

/// Result of an audio operation
#[derive(Debug, Clone)]
pub enum AudioOutput {
    /// Written to this WAV file
    Saved(PathBuf),

    /// Kept in memory for chaining
    Buffer(AudioData),
}

impl AudioOutput {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved(path) => Some(path),
            Self::Buffer(_) => None,
        }
    }

    pub fn buffer(&self) -> Option<&AudioData> {
        match self {
            Self::Saved(_) => None,
            Self::Buffer(data) => Some(data),
        }
    }

    pub fn into_buffer(self) -> Option<AudioData> {
        match self {
            Self::Saved(_) => None,
            Self::Buffer(data) => Some(data),
        }
    }
}
