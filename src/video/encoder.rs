use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use tokio::task;
use tracing::{debug, info, warn};

use crate::audio::{AudioData, AudioWriter};
use crate::config::VideoConfig;
use crate::error::{Result, VideoError};
use crate::video::graph::FrameRenderer;
use crate::video::types::VideoClip;

/// Renders clip graphs and encodes them with the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct VideoEncoder {
    config: VideoConfig,
}

impl VideoEncoder {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// Whether both `ffmpeg` and `ffprobe` can be run
    pub fn ffmpeg_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|binary| {
            Command::new(binary)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// Encode `clip` to `output`, sampling frames at `fps` or the clip's own rate
    pub async fn encode(&self, clip: &VideoClip, output: &Path, fps: Option<f64>) -> Result<PathBuf> {
        let encoder = self.clone();
        let clip = clip.clone();
        let output = output.to_path_buf();

        task::spawn_blocking(move || encoder.encode_blocking(&clip, &output, fps))
            .await
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("Encoder task failed: {}", e),
            })?
    }

    pub fn encode_blocking(&self, clip: &VideoClip, output: &Path, fps: Option<f64>) -> Result<PathBuf> {
        if !Self::ffmpeg_available() {
            return Err(VideoError::FfmpegUnavailable.into());
        }

        let fps = fps.unwrap_or(clip.fps());
        if !(fps.is_finite() && fps > 0.0) {
            return Err(VideoError::InvalidParameters {
                details: format!("Invalid output frame rate {}", fps),
            }.into());
        }

        let (width, height) = clip.size();
        let frame_count = clip.frame_count_at(fps);
        info!(
            "💾 Encoding {:?}: {}x{} @ {} fps, {} frames{}",
            output,
            width,
            height,
            fps,
            frame_count,
            if clip.has_audio() { " + audio" } else { "" }
        );

        // The audio track goes through a temporary WAV next to the pipe input
        let temp_dir = tempfile::tempdir()?;
        let audio_path = match clip.audio() {
            Some(audio) => {
                let path = temp_dir.path().join("audio.wav");
                AudioWriter::write_wav(&path, audio, 16)?;
                Some(path)
            }
            None => None,
        };

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &fps.to_string(), "-i", "-"]);
        if let Some(path) = &audio_path {
            cmd.arg("-i").arg(path);
        }
        cmd.args(["-map", "0:v:0"]);
        if audio_path.is_some() {
            cmd.args(["-map", "1:a:0", "-c:a", &self.config.audio_codec]);
        }
        if width % 2 != 0 || height % 2 != 0 {
            cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"]);
        }
        cmd.args(["-c:v", &self.config.video_codec, "-pix_fmt", "yuv420p"])
            .args(["-crf", &self.config.crf.to_string()])
            .args(["-threads", &self.config.encode_threads.to_string()])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut process = cmd.spawn().map_err(|_| VideoError::FfmpegUnavailable)?;
        let stderr = process.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });
        let Some(mut stdin) = process.stdin.take() else {
            abandon(&mut process, output);
            return Err(VideoError::EncodingFailed {
                reason: "Failed to open FFmpeg stdin".to_string(),
            }.into());
        };

        let mut renderer = FrameRenderer::new();
        let mut failure = None;
        for index in 0..frame_count {
            let frame = match renderer.render(clip, index as f64 / fps) {
                Ok(frame) => frame,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            if let Err(e) = stdin.write_all(frame.as_rgb_bytes()) {
                failure = Some(VideoError::EncodingFailed {
                    reason: format!("Failed to write frame: {}", e),
                }.into());
                break;
            }
            if index % 30 == 0 {
                debug!("Encoded frame {}/{}", index + 1, frame_count);
            }
        }
        drop(renderer);

        // Kill before closing stdin so ffmpeg never finalizes a partial file
        if let Some(e) = failure {
            abandon(&mut process, output);
            drop(stdin);
            let stderr = stderr.and_then(|handle| handle.join().ok()).unwrap_or_default();
            if !stderr.trim().is_empty() {
                debug!("FFmpeg stderr: {}", stderr.trim());
            }
            return Err(e);
        }
        drop(stdin);

        let status = process.wait().map_err(|e| VideoError::EncodingFailed {
            reason: format!("Failed to wait for FFmpeg: {}", e),
        })?;
        let stderr = stderr.and_then(|handle| handle.join().ok()).unwrap_or_default();

        if !status.success() {
            let _ = std::fs::remove_file(output);
            return Err(VideoError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr.trim()),
            }.into());
        }

        info!("✅ Wrote {:?}", output);
        Ok(output.to_path_buf())
    }

    /// Encode a buffer as MP3
    pub async fn write_mp3(&self, audio: &AudioData, output: &Path) -> Result<PathBuf> {
        let audio = audio.clone();
        let output = output.to_path_buf();

        task::spawn_blocking(move || -> Result<PathBuf> {
            if !Self::ffmpeg_available() {
                return Err(VideoError::FfmpegUnavailable.into());
            }

            let temp_dir = tempfile::tempdir()?;
            let wav = temp_dir.path().join("audio.wav");
            AudioWriter::write_wav(&wav, &audio, 16)?;

            let result = Command::new("ffmpeg")
                .args(["-y", "-nostdin", "-hide_banner", "-loglevel", "error", "-i"])
                .arg(&wav)
                .args(["-c:a", "libmp3lame", "-q:a", "2"])
                .arg(&output)
                .stdin(Stdio::null())
                .output()
                .map_err(|_| VideoError::FfmpegUnavailable)?;

            if !result.status.success() {
                return Err(VideoError::EncodingFailed {
                    reason: format!("FFmpeg failed: {}", String::from_utf8_lossy(&result.stderr).trim()),
                }.into());
            }

            info!("🎵 Wrote {:?}", output);
            Ok(output)
        })
        .await
        .map_err(|e| VideoError::EncodingFailed {
            reason: format!("Encoder task failed: {}", e),
        })?
    }
}

/// Stop an encode that cannot finish and drop whatever it wrote
fn abandon(process: &mut Child, output: &Path) {
    let _ = process.kill();
    let _ = process.wait();
    if std::fs::remove_file(output).is_ok() {
        warn!("🧹 Removed partial output {:?}", output);
    }
}
