use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    app::prompt::{Console, MediaKind},
    audio::{AudioEnhancer, AudioOutput},
    composition::{AudioVideoMerger, VideoMerger},
    config::Config,
    error::{AppError, ClipsmithError, Result},
    output::OutputMode,
    video::{ColorAdjustment, VideoEnhancer, VideoOutput},
};

const RULE: &str = "=============================";

/// The interactive workbench: a main menu over the four components
pub struct App<R, W> {
    console: Console<R, W>,
    config: Config,
    audio: AudioEnhancer,
    video: VideoEnhancer,
    video_merger: VideoMerger,
    av_merger: AudioVideoMerger,
}

impl<R: BufRead, W: Write> App<R, W> {
    /// Build every component from `config`, creating the output directories
    pub fn new(config: Config, input: R, output: W) -> Result<Self> {
        Ok(Self {
            console: Console::new(input, output),
            audio: AudioEnhancer::from_config(&config)?,
            video: VideoEnhancer::from_config(&config)?,
            video_merger: VideoMerger::from_config(&config)?,
            av_merger: AudioVideoMerger::from_config(&config)?,
            config,
        })
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    /// Run the main menu until the user exits or input ends
    pub async fn run(&mut self) -> Result<()> {
        info!("🎬 Clipsmith session started");
        match self.main_menu().await {
            Err(ClipsmithError::App(AppError::InputClosed)) => {
                debug!("Input closed, leaving the menu");
                Ok(())
            }
            other => other,
        }
    }

    async fn main_menu(&mut self) -> Result<()> {
        loop {
            self.console.say(format!("\n{}", RULE))?;
            self.console.say("🎬  CLIPSMITH")?;
            self.console.say(RULE)?;
            self.console.say("1. Audio Enhancements")?;
            self.console.say("2. Video Enhancements")?;
            self.console.say("3. Merge Two Videos")?;
            self.console.say("4. Merge Video + Audio")?;
            self.console.say("5. Full Pipeline")?;
            self.console.say("0. Exit")?;
            self.console.say(RULE)?;

            match self.console.ask("Select operation")?.as_str() {
                "1" => self.audio_menu().await?,
                "2" => self.video_menu().await?,
                "3" => self.merge_videos().await?,
                "4" => self.merge_audio_video().await?,
                "5" => self.full_pipeline().await?,
                "0" => {
                    self.console.say("👋 Goodbye!")?;
                    return Ok(());
                }
                _ => self.console.say("⚠️ Invalid choice. Try again.")?,
            }
        }
    }

    async fn audio_menu(&mut self) -> Result<()> {
        loop {
            self.console.say("\n🎧 AUDIO ENHANCEMENT MENU")?;
            self.console.say("1. Volume Up")?;
            self.console.say("2. Volume Down")?;
            self.console.say("3. Normalize")?;
            self.console.say("4. Fade In/Out")?;
            self.console.say("5. Speed Change")?;
            self.console.say("0. Go Back")?;

            let choice = self.console.ask("Select operation")?;
            if choice == "0" {
                return Ok(());
            }
            if !matches!(choice.as_str(), "1" | "2" | "3" | "4" | "5") {
                self.console.say("⚠️ Invalid choice.")?;
                continue;
            }

            let path = self.console.ask_path("Enter audio file path", MediaKind::Audio)?;
            let presets = self.config.presets.clone();
            let result = match choice.as_str() {
                "1" => self.audio.increase_volume(path, presets.volume_up_db, OutputMode::Save).await,
                "2" => self.audio.decrease_volume(path, presets.volume_down_db, OutputMode::Save).await,
                "3" => self.audio.normalize(path, presets.normalize_target_db, OutputMode::Save).await,
                "4" => self.fade_in_out(path, presets.fade_duration).await,
                _ => match self.console.ask_number("Enter speed factor (e.g., 1.5 for faster, 0.8 for slower)") {
                    Ok(factor) => self.audio.speed_change(path, factor as f32, OutputMode::Save).await,
                    Err(ClipsmithError::App(AppError::InputClosed)) => return Err(AppError::InputClosed.into()),
                    Err(e) => Err(e),
                },
            };

            match result {
                Ok(output) => {
                    self.console.say(format!("✅ Saved: {}", shown(output.path())))?;
                    self.console.say("✅ Audio processed successfully.")?;
                }
                Err(e) => self.report("Error", &e)?,
            }
        }
    }

    async fn fade_in_out(&self, path: PathBuf, duration: f32) -> Result<AudioOutput> {
        let faded_in = self.audio.fade_in(path, duration, OutputMode::InMemory).await?;
        self.audio.fade_out(faded_in, duration, OutputMode::Save).await
    }

    async fn video_menu(&mut self) -> Result<()> {
        loop {
            self.console.say("\n🎨 VIDEO ENHANCEMENT MENU")?;
            self.console.say("1. Adjust Color")?;
            self.console.say("2. Brightness/Contrast Only")?;
            self.console.say("0. Go Back")?;

            let adjustment: ColorAdjustment = match self.console.ask("Select operation")?.as_str() {
                "0" => return Ok(()),
                "1" => self.config.presets.color,
                "2" => self.config.presets.brightness_contrast,
                _ => {
                    self.console.say("⚠️ Invalid choice.")?;
                    continue;
                }
            };

            let path = self.console.ask_path("Enter video file path", MediaKind::Video)?;
            let result = self
                .video
                .adjust_color(
                    path,
                    adjustment.brightness,
                    adjustment.contrast,
                    adjustment.saturation,
                    OutputMode::Save,
                )
                .await;

            match result {
                Ok(output) => {
                    self.console.say(format!("✅ Saved: {}", shown(output.path())))?;
                    self.console.say("✅ Video processed successfully.")?;
                }
                Err(e) => self.report("Error", &e)?,
            }
        }
    }

    async fn merge_videos(&mut self) -> Result<()> {
        self.console.say("\n🎞️ MERGE TWO VIDEOS")?;
        let first = self.console.ask_path("Enter first video path", MediaKind::Video)?;
        let second = self.console.ask_path("Enter second video path", MediaKind::Video)?;

        let crossfade = self.config.composition.default_crossfade;
        match self.video_merger.merge(first, second, crossfade, OutputMode::Save).await {
            Ok(output) => self.console.say(format!("✅ Videos merged successfully: {}", shown(output.path()))),
            Err(e) => self.report("Failed to merge", &e),
        }
    }

    async fn merge_audio_video(&mut self) -> Result<()> {
        self.console.say("\n🎚️ MERGE VIDEO + AUDIO")?;
        let video = self.console.ask_path("Enter video file path", MediaKind::Video)?;
        let audio = self.console.ask_path("Enter audio file path", MediaKind::Audio)?;

        let name = self.config.presets.av_merge_output.clone();
        match self.av_merger.merge(video, audio, &name, OutputMode::Save, None).await {
            Ok(output) => self.console.say(format!("✅ Merged output saved: {}", shown(output.path()))),
            Err(e) => self.report("Failed", &e),
        }
    }

    async fn full_pipeline(&mut self) -> Result<()> {
        self.console.say("\n🚀 FULL PIPELINE")?;
        let video = self.console.ask_path("Enter video file path", MediaKind::Video)?;
        let audio = self.console.ask_path("Enter audio file path", MediaKind::Audio)?;

        match self.run_pipeline(video, audio).await {
            Ok(output) => self.console.say(format!("✅ Final video ready: {}", shown(output.path()))),
            Err(e) => self.report("Pipeline failed", &e),
        }
    }

    /// Quieter audio, color preset on the video, then both merged and saved
    /// at the video's frame rate
    async fn run_pipeline(&mut self, video: PathBuf, audio: PathBuf) -> Result<VideoOutput> {
        let presets = self.config.presets.clone();

        self.console.say("Step 1️⃣: Decreasing volume...")?;
        let quieter = self
            .audio
            .decrease_volume(audio, presets.pipeline_volume_db, OutputMode::InMemory)
            .await?;

        self.console.say("Step 2️⃣: Enhancing video...")?;
        let color = presets.color;
        let enhanced = self
            .video
            .adjust_color(video, color.brightness, color.contrast, color.saturation, OutputMode::InMemory)
            .await?;

        self.console.say("Step 3️⃣: Combining audio + video...")?;
        let fps = enhanced.clip().map(|clip| clip.fps());
        self.av_merger
            .merge(enhanced, quieter, &presets.pipeline_output, OutputMode::Save, fps)
            .await
    }

    fn report(&mut self, context: &str, error: &ClipsmithError) -> Result<()> {
        self.console.say(format!("❌ {}: {}", context, error.user_message()))
    }
}

fn shown(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(in memory)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioData, AudioWriter};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn app_with(script: &str, root: &Path) -> App<Cursor<Vec<u8>>, Vec<u8>> {
        let mut config = Config::default();
        config.output.root = root.to_path_buf();
        App::new(config, Cursor::new(script.as_bytes().to_vec()), Vec::new()).unwrap()
    }

    fn printed(app: &App<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(app.console().output().clone()).unwrap()
    }

    fn tone(path: &Path) {
        let samples = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin() * 0.1)
            .collect();
        AudioWriter::write_wav(path, &AudioData::new(samples, 8000), 16).unwrap();
    }

    #[tokio::test]
    async fn test_exit_and_invalid_choice() {
        let dir = tempdir().unwrap();
        let mut app = app_with("9\n0\n", dir.path());
        app.run().await.unwrap();

        let out = printed(&app);
        assert!(out.contains("⚠️ Invalid choice. Try again."));
        assert!(out.contains("👋 Goodbye!"));
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let dir = tempdir().unwrap();
        let mut app = app_with("1\n", dir.path());
        app.run().await.unwrap();
        assert!(printed(&app).contains("AUDIO ENHANCEMENT MENU"));
    }

    #[tokio::test]
    async fn test_volume_up_writes_file() {
        let dir = tempdir().unwrap();
        let song = dir.path().join("song.wav");
        tone(&song);

        let script = format!("1\n1\n{}\ny\n0\n0\n", song.display());
        let mut app = app_with(&script, dir.path());
        app.run().await.unwrap();

        let expected = dir.path().join("enhanced_audio").join("song_volup5.0.wav");
        assert!(expected.exists());
        assert!(printed(&app).contains("✅ Audio processed successfully."));
    }

    #[tokio::test]
    async fn test_fade_chain_writes_single_file() {
        let dir = tempdir().unwrap();
        let song = dir.path().join("song.wav");
        tone(&song);

        let script = format!("1\n4\n{}\ny\n0\n0\n", song.display());
        let mut app = app_with(&script, dir.path());
        app.run().await.unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("enhanced_audio"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(written, vec!["audio_fadeout2.0.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_speed_factor_returns_to_menu() {
        let dir = tempdir().unwrap();
        let song = dir.path().join("song.wav");
        tone(&song);

        let script = format!("1\n5\n{}\ny\nquick\n0\n0\n", song.display());
        let mut app = app_with(&script, dir.path());
        app.run().await.unwrap();

        let out = printed(&app);
        assert!(out.contains("❌ Error: 'quick' is not a valid number."));
        assert!(out.contains("👋 Goodbye!"));
    }

    #[tokio::test]
    async fn test_extreme_speed_factor_is_rejected() {
        let dir = tempdir().unwrap();
        let song = dir.path().join("song.wav");
        tone(&song);

        let script = format!("1\n5\n{}\ny\n0.0001\n0\n0\n", song.display());
        let mut app = app_with(&script, dir.path());
        app.run().await.unwrap();

        let out = printed(&app);
        assert!(out.contains("❌ Error:"));
        assert!(out.contains("Speed factor 0.0001 is outside"));
        assert!(out.contains("👋 Goodbye!"));
        assert_eq!(std::fs::read_dir(dir.path().join("enhanced_audio")).unwrap().count(), 0);
    }
}
