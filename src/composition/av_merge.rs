use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::{
    audio::{AudioData, AudioInput, AudioLoader},
    config::{CompositionConfig, Config, VideoConfig},
    error::{CompositionError, Result},
    output::OutputMode,
    video::{VideoClip, VideoEncoder, VideoInput, VideoLoader, VideoOutput},
};

/// File name used when the caller has no preference
pub const DEFAULT_OUTPUT_NAME: &str = "merged_video.mp4";

/// Fit `audio` to a video of `video_duration` seconds.
///
/// Shorter audio is looped `floor(v / a) + 1` times and cut at the video's
/// end; longer audio is cut; audio of exactly the video's length (in samples)
/// comes back unchanged.
pub fn reconcile(audio: &AudioData, video_duration: f64, config: &CompositionConfig) -> Result<AudioData> {
    if !(video_duration.is_finite() && video_duration > 0.0) {
        return Err(CompositionError::InvalidParameters {
            details: format!("Video duration must be positive, got {}", video_duration),
        }.into());
    }

    let audio_duration = audio.duration();
    if !(audio_duration >= config.min_audio_duration) {
        return Err(CompositionError::InvalidAudioDuration {
            duration: audio_duration,
            minimum: config.min_audio_duration,
        }.into());
    }

    let target = (video_duration * audio.sample_rate as f64).round() as usize;
    info!("Video length: {:.2}s | Audio length: {:.2}s", video_duration, audio_duration);

    if audio.len() < target {
        let loop_count = (video_duration / audio_duration).floor() as usize + 1;
        if loop_count > config.max_loop_count {
            return Err(CompositionError::LoopLimitExceeded {
                count: loop_count,
                limit: config.max_loop_count,
            }.into());
        }
        info!("🔁 Audio shorter → looping {}x to fit video.", loop_count);
        let samples = audio.samples.iter().copied().cycle().take(target).collect();
        Ok(AudioData::new(samples, audio.sample_rate))
    } else if audio.len() > target {
        info!("✂️ Audio longer → trimming to fit video duration.");
        Ok(AudioData::new(audio.samples[..target].to_vec(), audio.sample_rate))
    } else {
        debug!("Audio already matches the video length");
        Ok(audio.clone())
    }
}

/// Attaches an audio track to a video, looping or trimming it to the
/// video's length
pub struct AudioVideoMerger {
    output_dir: PathBuf,
    video: VideoConfig,
    composition: CompositionConfig,
    encoder: VideoEncoder,
}

impl AudioVideoMerger {
    pub fn new<P: Into<PathBuf>>(
        output_dir: P,
        video: VideoConfig,
        composition: CompositionConfig,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            encoder: VideoEncoder::new(video.clone()),
            video,
            composition,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.output.av_path(),
            config.video.clone(),
            config.composition.clone(),
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Replace the video's audio track with `audio`, reconciled to its length.
    ///
    /// When saving, the result is written to `output_name` inside the output
    /// directory at `fps` (or the clip's own rate). Failures are logged here
    /// and handed back to the caller.
    pub async fn merge(
        &self,
        video: impl Into<VideoInput>,
        audio: impl Into<AudioInput>,
        output_name: &str,
        mode: OutputMode,
        fps: Option<f64>,
    ) -> Result<VideoOutput> {
        let result = self.merge_inner(video.into(), audio.into(), output_name, mode, fps).await;
        if let Err(e) = &result {
            error!("❌ Merge failed: {}", e);
        }
        result
    }

    async fn merge_inner(
        &self,
        video: VideoInput,
        audio: AudioInput,
        output_name: &str,
        mode: OutputMode,
        fps: Option<f64>,
    ) -> Result<VideoOutput> {
        let clip = match video {
            VideoInput::File(path) => {
                if !path.exists() {
                    return Err(CompositionError::MissingInput { path: path.display().to_string() }.into());
                }
                VideoLoader::open(&path, self.video.audio_sample_rate).await?
            }
            VideoInput::Clip(clip) => clip,
        };

        let audio = match audio {
            AudioInput::File(path) => {
                if !path.exists() {
                    return Err(CompositionError::MissingInput { path: path.display().to_string() }.into());
                }
                AudioLoader::load(&path).await?
            }
            AudioInput::Buffer(data) => data,
        };

        let reconciled = reconcile(&audio, clip.duration(), &self.composition)?;
        let merged: VideoClip = clip.with_audio(reconciled);

        if !mode.is_save() {
            return Ok(VideoOutput::Clip(merged));
        }

        let output = self.output_dir.join(output_name);
        let path = self.encoder.encode(&merged, &output, fps).await?;
        info!("✅ Merged video created successfully: {:?}", path);
        Ok(VideoOutput::Saved(path))
    }
}
