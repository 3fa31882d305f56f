use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::{
    audio::AudioOutput,
    config::{Config, VideoConfig},
    error::{Result, VideoError},
    output::{derived_path, format_param, OutputMode},
    video::{
        color::ColorAdjustment,
        encoder::VideoEncoder,
        loader::VideoLoader,
        text::{anchor_offset, TextRenderer, TextStyle},
        types::{HorizontalAnchor, Position, VerticalAnchor, VideoClip, VideoInput, VideoOutput},
    },
};

/// Where [`VideoEnhancer::add_watermark`] callers put text by default
pub const DEFAULT_WATERMARK_POSITION: Position = (HorizontalAnchor::Right, VerticalAnchor::Bottom);

/// Video operation set.
///
/// Mirrors the audio set: each operation accepts a file path or an in-memory
/// clip, and either returns the transformed clip or encodes it to
/// `<base>_<suffix>.mp4` in the output directory.
pub struct VideoEnhancer {
    output_dir: PathBuf,
    config: VideoConfig,
    encoder: VideoEncoder,
    text: TextRenderer,
}

impl VideoEnhancer {
    /// Create an enhancer writing into `output_dir` (created if missing)
    pub fn new<P: Into<PathBuf>>(output_dir: P, config: VideoConfig) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        let text = TextRenderer::new(config.font_path.as_deref());
        Ok(Self {
            output_dir,
            encoder: VideoEncoder::new(config.clone()),
            config,
            text,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.output.video_path(), config.video.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Multiply brightness, contrast and saturation (1.0 leaves a channel unchanged)
    pub async fn adjust_color(
        &self,
        input: impl Into<VideoInput>,
        brightness: f32,
        contrast: f32,
        saturation: f32,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        let adjustment = ColorAdjustment::new(brightness, contrast, saturation);
        info!("🎨 Adjusting color: {:?}", adjustment);
        let (clip, base) = self.resolve(input.into()).await?;
        let adjusted = clip.adjusted(adjustment)?;
        self.finish(adjusted, &base, "color_adj", mode).await
    }

    pub async fn speed_change(
        &self,
        input: impl Into<VideoInput>,
        factor: f64,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        info!("⏩ Changing speed x{}", factor);
        self.config.check_speed(factor)?;
        let (clip, base) = self.resolve(input.into()).await?;
        let faster = clip.speedx(factor)?;
        self.finish(faster, &base, &format!("speed{}", format_param(factor)), mode).await
    }

    pub async fn fade_in_out(
        &self,
        input: impl Into<VideoInput>,
        fade_in: f64,
        fade_out: f64,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        info!("🌗 Fading in {}s / out {}s", fade_in, fade_out);
        let (clip, base) = self.resolve(input.into()).await?;
        let faded = clip.faded(fade_in, fade_out)?;
        self.finish(faded, &base, "fade", mode).await
    }

    /// Keep `[start, end)` seconds; `None` (or `Some(0.0)`) runs to the end of the clip
    pub async fn trim(
        &self,
        input: impl Into<VideoInput>,
        start: f64,
        end: Option<f64>,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        let end = end.filter(|&e| e != 0.0);
        let (clip, base) = self.resolve(input.into()).await?;
        let trimmed = clip.subclip(start, end)?;
        let end_label = end.map(format_param).unwrap_or_else(|| "end".to_string());
        self.finish(trimmed, &base, &format!("cut{}-{}", format_param(start), end_label), mode).await
    }

    /// Overlay outlined white text at `position`
    pub async fn add_watermark(
        &self,
        input: impl Into<VideoInput>,
        text: &str,
        position: Position,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        info!("💧 Adding watermark {:?} at {:?}", text, position);
        let (clip, base) = self.resolve(input.into()).await?;
        let layer = self.text.render(text, &TextStyle::watermark())?;
        let (x, y) = anchor_offset(clip.size(), layer.size(), position);
        self.finish(clip.with_overlay(layer, x, y), &base, "wm", mode).await
    }

    /// Overlay `text` on a black band along the bottom edge
    pub async fn add_subtitles(
        &self,
        input: impl Into<VideoInput>,
        text: &str,
        mode: OutputMode,
    ) -> Result<VideoOutput> {
        info!("💬 Adding subtitles {:?}", text);
        let (clip, base) = self.resolve(input.into()).await?;
        let layer = self.text.render(text, &TextStyle::subtitle(clip.width()))?;
        let (x, y) = anchor_offset(
            clip.size(),
            layer.size(),
            (HorizontalAnchor::Center, VerticalAnchor::Bottom),
        );
        self.finish(clip.with_overlay(layer, x, y), &base, "subtitled", mode).await
    }

    /// The clip's audio track, in memory or written as `<base>_audio.mp3`
    pub async fn extract_audio(&self, input: impl Into<VideoInput>, mode: OutputMode) -> Result<AudioOutput> {
        let (clip, base) = self.resolve(input.into()).await?;
        let audio = clip
            .audio()
            .cloned()
            .ok_or_else(|| VideoError::NoAudioTrack { name: base.clone() })?;

        if mode.is_save() {
            let output = derived_path(&self.output_dir, &base, "audio", "mp3");
            let path = self.encoder.write_mp3(&audio, &output).await?;
            return Ok(AudioOutput::Saved(path));
        }
        Ok(AudioOutput::Buffer(audio))
    }

    async fn resolve(&self, input: VideoInput) -> Result<(VideoClip, String)> {
        let base = input.base_name();
        let clip = match input {
            VideoInput::File(path) => VideoLoader::open(&path, self.config.audio_sample_rate).await?,
            VideoInput::Clip(clip) => clip,
        };
        Ok((clip, base))
    }

    async fn finish(&self, clip: VideoClip, base: &str, suffix: &str, mode: OutputMode) -> Result<VideoOutput> {
        if !mode.is_save() {
            return Ok(VideoOutput::Clip(clip));
        }

        let output = derived_path(&self.output_dir, base, suffix, "mp4");
        match self.encoder.encode(&clip, &output, None).await {
            Ok(path) => Ok(VideoOutput::Saved(path)),
            Err(e) => {
                error!("❌ Failed to write {:?}: {}", output, e);
                Err(e)
            }
        }
    }
}
