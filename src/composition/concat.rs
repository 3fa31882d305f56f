use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::{
    config::{CompositionConfig, Config, VideoConfig},
    error::{CompositionError, Result},
    output::OutputMode,
    video::{VideoClip, VideoEncoder, VideoInput, VideoLoader, VideoOutput},
};

/// Joins two clips (typically an intro and a main video) after normalizing
/// both to the configured resolution and frame rate
pub struct VideoMerger {
    output_dir: PathBuf,
    video: VideoConfig,
    composition: CompositionConfig,
    encoder: VideoEncoder,
}

impl VideoMerger {
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
            config.output.merged_path(),
            config.video.clone(),
            config.composition.clone(),
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where a saved merge is written
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.composition.concat_output_name)
    }

    /// Play `intro` then `main`, crossfading over `crossfade` seconds when it
    /// is positive.
    ///
    /// Failures are logged here and handed back to the caller.
    pub async fn merge(
        &self,
        intro: impl Into<VideoInput>,
        main: impl Into<VideoInput>,
        crossfade: f64,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        let result = self.merge_inner(intro.into(), main.into(), crossfade, mode).await;
        if let Err(e) = &result {
            error!("❌ Merge failed: {}", e);
        }
        result
    }

    async fn merge_inner(
        &self,
        intro: VideoInput,
        main: VideoInput,
        crossfade: f64,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        for (label, input) in [("Intro", &intro), ("Main", &main)] {
            if let VideoInput::File(path) = input {
                if !path.exists() {
                    error!("⚠️ {} file is missing: {:?}", label, path);
                    return Err(CompositionError::MissingInput { path: path.display().to_string() }.into());
                }
            }
        }
        if !(crossfade >= 0.0 && crossfade.is_finite()) {
            return Err(CompositionError::InvalidParameters {
                details: format!("Crossfade must be zero or positive, got {}", crossfade),
            }.into());
        }

        info!("🎬 Loading videos...");
        let intro = self.load(intro).await?;
        let main = self.load(main).await?;

        let (width, height) = self.video.target_resolution;
        info!("📏 Normalizing videos to {}x{} / {} fps...", width, height, self.video.target_fps);
        let intro = self.normalize(&intro)?;
        let main = self.normalize(&main)?;

        if crossfade > 0.0 {
            info!("🎞️ Applying crossfade transition: {:.1}s", crossfade);
        } else {
            info!("🧩 Simple concatenation...");
        }
        let merged = VideoClip::concatenate(&intro, &main, crossfade)?;

        if !mode.is_save() {
            return Ok(VideoOutput::Clip(merged));
        }

        let output = self.output_path();
        info!("💾 Exporting merged video to {:?}", output);
        let path = self.encoder.encode(&merged, &output, None).await?;
        info!("✅ Merge complete: {:?}", path);
        Ok(VideoOutput::Saved(path))
    }

    async fn load(&self, input: VideoInput) -> Result<VideoClip> {
        match input {
            VideoInput::File(path) => VideoLoader::open(&path, self.video.audio_sample_rate).await,
            VideoInput::Clip(clip) => Ok(clip),
        }
    }

    fn normalize(&self, clip: &VideoClip) -> Result<VideoClip> {
        let (width, height) = self.video.target_resolution;
        let resized = if clip.size() == (width, height) {
            clip.clone()
        } else {
            clip.resized(width, height)?
        };
        Ok(resized.with_fps(self.video.target_fps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioData;
    use tempfile::tempdir;

    fn merger() -> (tempfile::TempDir, VideoMerger) {
        let dir = tempdir().unwrap();
        let merger = VideoMerger::new(
            dir.path().join("merged_videos"),
            VideoConfig::default(),
            CompositionConfig::default(),
        )
        .unwrap();
        (dir, merger)
    }

    fn solid(color: [u8; 3]) -> VideoClip {
        VideoClip::solid(color, (320, 240), 1.0, 24.0)
    }

    #[tokio::test]
    async fn test_plain_concatenation_normalizes_geometry() {
        let (_dir, merger) = merger();
        let merged = merger
            .merge(solid([255, 0, 0]), solid([0, 0, 255]), 0.0, OutputMode::InMemory)
            .await
            .unwrap()
            .into_clip()
            .unwrap();

        assert!((merged.duration() - 2.0).abs() < 1e-9);
        assert_eq!(merged.size(), (1280, 720));
        assert_eq!(merged.fps(), 30.0);
        assert_eq!(merged.frame_at(0.5).unwrap().get_pixel(640, 360), [255, 0, 0]);
        assert_eq!(merged.frame_at(1.5).unwrap().get_pixel(640, 360), [0, 0, 255]);
    }

    #[tokio::test]
    async fn test_crossfade_shortens_and_blends() {
        let (_dir, merger) = merger();
        let first = solid([255, 0, 0]).with_audio(AudioData::silence(1.0, 8000));
        let merged = merger
            .merge(first, solid([0, 0, 255]), 0.5, OutputMode::InMemory)
            .await
            .unwrap()
            .into_clip()
            .unwrap();

        assert!((merged.duration() - 1.5).abs() < 1e-9);
        let middle = merged.frame_at(0.75).unwrap().get_pixel(10, 10);
        assert!(middle[0] > 0 && middle[2] > 0);

        let audio = merged.audio().unwrap();
        assert!((audio.duration() - 1.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_missing_intro_is_reported() {
        let (_dir, merger) = merger();
        let result = merger
            .merge("/no/such/intro.mp4", solid([0, 0, 0]), 0.0, OutputMode::InMemory)
            .await;
        assert!(matches!(
            result,
            Err(crate::ClipsmithError::Composition(CompositionError::MissingInput { .. }))
        ));
    }

    #[tokio::test]
    async fn test_crossfade_longer_than_clip_fails() {
        let (_dir, merger) = merger();
        let result = merger
            .merge(solid([0, 0, 0]), solid([0, 0, 0]), 2.0, OutputMode::InMemory)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_saved_merge_uses_fixed_name() {
        if !VideoEncoder::ffmpeg_available() {
            return;
        }
        let (_dir, merger) = merger();
        let output = merger
            .merge(solid([255, 0, 0]), solid([0, 255, 0]), 0.0, OutputMode::Save)
            .await
            .unwrap();

        let path = output.path().unwrap();
        assert_eq!(path, merger.output_path());
        let info = VideoLoader::probe(path).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.duration - 2.0).abs() < 0.1);
    }
}
