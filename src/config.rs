use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AudioError, ConfigError, Result, VideoError},
    video::ColorAdjustment,
};

/// Main configuration for Clipsmith
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where each component writes its results
    pub output: OutputConfig,

    /// Audio processing settings
    pub audio: AudioConfig,

    /// Video decoding, rendering and encoding settings
    pub video: VideoConfig,

    /// Concatenation and audio/video merge settings
    pub composition: CompositionConfig,

    /// Fixed parameters used by the interactive menu
    pub presets: PresetConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;
        self.audio.validate()?;
        self.video.validate()?;
        self.composition.validate()?;
        self.presets.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Output directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the component directories are created under
    pub root: PathBuf,

    /// Audio enhancement results
    pub audio_dir: String,

    /// Video enhancement results
    pub video_dir: String,

    /// Two-video concatenation results
    pub merged_dir: String,

    /// Audio/video merge results
    pub av_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            audio_dir: "enhanced_audio".to_string(),
            video_dir: "enhanced_videos".to_string(),
            merged_dir: "merged_videos".to_string(),
            av_dir: "output_videos".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn audio_path(&self) -> PathBuf {
        self.root.join(&self.audio_dir)
    }

    pub fn video_path(&self) -> PathBuf {
        self.root.join(&self.video_dir)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.root.join(&self.merged_dir)
    }

    pub fn av_path(&self) -> PathBuf {
        self.root.join(&self.av_dir)
    }

    fn validate(&self) -> Result<()> {
        for (key, dir) in [
            ("output.audio_dir", &self.audio_dir),
            ("output.video_dir", &self.video_dir),
            ("output.merged_dir", &self.merged_dir),
            ("output.av_dir", &self.av_dir),
        ] {
            if dir.trim().is_empty() {
                return Err(invalid(key, "\"\"").into());
            }
        }
        Ok(())
    }
}

/// Audio processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFT size of the time-stretch STFT
    pub stretch_fft_size: usize,

    /// Hop size of the time-stretch STFT
    pub stretch_hop_size: usize,

    /// Added to the RMS before taking its logarithm
    pub rms_epsilon: f32,

    /// Bit depth of written WAV files (16, 24 or 32)
    pub wav_bit_depth: u16,

    /// Slowest speed factor `speed_change` accepts
    pub min_speed: f32,

    /// Fastest speed factor `speed_change` accepts
    pub max_speed: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            stretch_fft_size: 2048,
            stretch_hop_size: 512,
            rms_epsilon: 1e-6,
            wav_bit_depth: 16,
            min_speed: 0.05,
            max_speed: 20.0,
        }
    }
}

impl AudioConfig {
    /// Reject speed factors outside `[min_speed, max_speed]`
    pub fn check_speed(&self, factor: f32) -> Result<()> {
        if !(factor >= self.min_speed && factor <= self.max_speed) {
            return Err(AudioError::InvalidParameters {
                details: format!(
                    "Speed factor {} is outside {}..={}",
                    factor, self.min_speed, self.max_speed
                ),
            }.into());
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.stretch_fft_size == 0 || !self.stretch_fft_size.is_power_of_two() {
            return Err(invalid("audio.stretch_fft_size", self.stretch_fft_size).into());
        }

        if self.stretch_hop_size == 0 || self.stretch_hop_size > self.stretch_fft_size {
            return Err(invalid("audio.stretch_hop_size", self.stretch_hop_size).into());
        }

        if !(self.rms_epsilon > 0.0) {
            return Err(invalid("audio.rms_epsilon", self.rms_epsilon).into());
        }

        if !matches!(self.wav_bit_depth, 16 | 24 | 32) {
            return Err(invalid("audio.wav_bit_depth", self.wav_bit_depth).into());
        }

        if !(self.min_speed > 0.0 && self.min_speed <= 1.0) {
            return Err(invalid("audio.min_speed", self.min_speed).into());
        }

        if !(self.max_speed >= 1.0 && self.max_speed.is_finite()) {
            return Err(invalid("audio.max_speed", self.max_speed).into());
        }

        Ok(())
    }
}

/// Video processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Geometry both clips are normalized to before concatenation
    pub target_resolution: (u32, u32),

    /// Frame rate both clips are normalized to before concatenation
    pub target_fps: f64,

    /// Encoder passed to `-c:v`
    pub video_codec: String,

    /// Encoder passed to `-c:a`
    pub audio_codec: String,

    /// Threads handed to the encoder
    pub encode_threads: usize,

    /// Constant rate factor for the video encoder (0-51, lower is better)
    pub crf: u8,

    /// Sample rate audio tracks are decoded at
    pub audio_sample_rate: u32,

    /// TrueType font used for watermarks and subtitles
    pub font_path: Option<PathBuf>,

    /// Slowest speed factor `speed_change` accepts
    pub min_speed: f64,

    /// Fastest speed factor `speed_change` accepts
    pub max_speed: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            target_resolution: (1280, 720),
            target_fps: 30.0,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            encode_threads: num_cpus::get().min(4),
            crf: 23,
            audio_sample_rate: 44100,
            font_path: None,
            min_speed: 0.05,
            max_speed: 20.0,
        }
    }
}

impl VideoConfig {
    /// Reject speed factors outside `[min_speed, max_speed]`
    pub fn check_speed(&self, factor: f64) -> Result<()> {
        if !(factor >= self.min_speed && factor <= self.max_speed) {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "Speed factor {} is outside {}..={}",
                    factor, self.min_speed, self.max_speed
                ),
            }.into());
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let (width, height) = self.target_resolution;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(invalid("video.target_resolution", format!("{}x{}", width, height)).into());
        }

        if !(self.target_fps > 0.0) {
            return Err(invalid("video.target_fps", self.target_fps).into());
        }

        if self.encode_threads == 0 {
            return Err(invalid("video.encode_threads", self.encode_threads).into());
        }

        if self.crf > 51 {
            return Err(invalid("video.crf", self.crf).into());
        }

        if self.audio_sample_rate == 0 {
            return Err(invalid("video.audio_sample_rate", self.audio_sample_rate).into());
        }

        if self.video_codec.trim().is_empty() {
            return Err(invalid("video.video_codec", "\"\"").into());
        }

        if self.audio_codec.trim().is_empty() {
            return Err(invalid("video.audio_codec", "\"\"").into());
        }

        if !(self.min_speed > 0.0 && self.min_speed <= 1.0) {
            return Err(invalid("video.min_speed", self.min_speed).into());
        }

        if !(self.max_speed >= 1.0 && self.max_speed.is_finite()) {
            return Err(invalid("video.max_speed", self.max_speed).into());
        }

        Ok(())
    }
}

/// Concatenation and audio/video merge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Crossfade used by the menu when joining two videos (seconds)
    pub default_crossfade: f64,

    /// Upper bound on how many copies of a short audio track are looped
    pub max_loop_count: usize,

    /// Shortest audio track the merge component accepts (seconds)
    pub min_audio_duration: f64,

    /// File name of the concatenation output
    pub concat_output_name: String,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            default_crossfade: 0.0,
            max_loop_count: 10_000,
            min_audio_duration: 0.001,
            concat_output_name: "final_merged.mp4".to_string(),
        }
    }
}

impl CompositionConfig {
    fn validate(&self) -> Result<()> {
        if !(self.default_crossfade >= 0.0) {
            return Err(invalid("composition.default_crossfade", self.default_crossfade).into());
        }

        if self.max_loop_count == 0 {
            return Err(invalid("composition.max_loop_count", self.max_loop_count).into());
        }

        if !(self.min_audio_duration > 0.0) {
            return Err(invalid("composition.min_audio_duration", self.min_audio_duration).into());
        }

        if self.concat_output_name.trim().is_empty() {
            return Err(invalid("composition.concat_output_name", "\"\"").into());
        }

        Ok(())
    }
}

/// Parameters the menu actions pass to the components
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub volume_up_db: f32,
    pub volume_down_db: f32,
    pub normalize_target_db: f32,
    pub fade_duration: f32,
    pub pipeline_volume_db: f32,
    pub av_merge_output: String,
    pub pipeline_output: String,
    pub color: ColorAdjustment,
    pub brightness_contrast: ColorAdjustment,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            volume_up_db: 5.0,
            volume_down_db: -5.0,
            normalize_target_db: -14.0,
            fade_duration: 2.0,
            pipeline_volume_db: -10.0,
            av_merge_output: "merged_output.mp4".to_string(),
            pipeline_output: "final_output.mp4".to_string(),
            color: ColorAdjustment::new(1.1, 1.2, 1.3),
            brightness_contrast: ColorAdjustment::new(1.2, 1.5, 1.0),
        }
    }
}

impl PresetConfig {
    fn validate(&self) -> Result<()> {
        if self.volume_down_db > 0.0 {
            return Err(invalid("presets.volume_down_db", self.volume_down_db).into());
        }

        if self.pipeline_volume_db > 0.0 {
            return Err(invalid("presets.pipeline_volume_db", self.pipeline_volume_db).into());
        }

        if !(self.fade_duration > 0.0) {
            return Err(invalid("presets.fade_duration", self.fade_duration).into());
        }

        for (key, adjustment) in [
            ("presets.color", &self.color),
            ("presets.brightness_contrast", &self.brightness_contrast),
        ] {
            if !adjustment.is_valid() {
                return Err(invalid(key, format!("{:?}", adjustment)).into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("clipsmith.toml");

        let mut original_config = Config::default();
        original_config.video.font_path = Some(PathBuf::from("/fonts/Sans.ttf"));
        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config.video.target_resolution, loaded_config.video.target_resolution);
        assert_eq!(original_config.presets.color, loaded_config.presets.color);
        assert_eq!(loaded_config.video.font_path, Some(PathBuf::from("/fonts/Sans.ttf")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[presets]\nvolume_up_db = 3.0\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.presets.volume_up_db, 3.0);
        assert_eq!(config.presets.normalize_target_db, -14.0);
        assert_eq!(config.output.audio_dir, "enhanced_audio");
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(matches!(
            result,
            Err(crate::ClipsmithError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_invalid_fft_size() {
        let mut config = Config::default();
        config.audio.stretch_fft_size = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_odd_resolution_rejected() {
        let mut config = Config::default();
        config.video.target_resolution = (1279, 720);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_positive_volume_down_rejected() {
        let mut config = Config::default();
        config.presets.volume_down_db = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speed_bounds() {
        let config = Config::default();
        assert!(config.audio.check_speed(1.5).is_ok());
        assert!(config.audio.check_speed(20.0).is_ok());
        assert!(config.audio.check_speed(0.0001).is_err());
        assert!(config.audio.check_speed(f32::NAN).is_err());
        assert!(matches!(
            config.video.check_speed(50.0),
            Err(crate::ClipsmithError::Video(VideoError::InvalidParameters { .. }))
        ));

        let mut config = Config::default();
        config.audio.min_speed = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_paths_follow_root() {
        let mut config = Config::default();
        config.output.root = PathBuf::from("/tmp/session");
        assert_eq!(config.output.merged_path(), PathBuf::from("/tmp/session/merged_videos"));
        assert_eq!(config.output.av_path(), PathBuf::from("/tmp/session/output_videos"));
    }
}
