use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;

use tokio::task;
use tracing::{debug, info};

use crate::audio::AudioData;
use crate::error::{Result, VideoError};
use crate::output::extension_of;
use crate::video::graph::ClipNode;
use crate::video::types::{Frame, VideoClip};

/// Stream metadata reported by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
    pub has_audio: bool,
}

/// Opens video files as clip handles using the `ffprobe`/`ffmpeg` binaries
pub struct VideoLoader;

impl VideoLoader {
    /// Probe `path` and return a clip handle with its audio track decoded
    /// at `audio_sample_rate`
    pub async fn open<P: AsRef<Path>>(path: P, audio_sample_rate: u32) -> Result<VideoClip> {
        let path = path.as_ref().to_path_buf();
        task::spawn_blocking(move || Self::open_blocking(&path, audio_sample_rate))
            .await
            .map_err(|e| VideoError::DecodingFailed { reason: e.to_string() })?
    }

    pub fn open_blocking(path: &Path, audio_sample_rate: u32) -> Result<VideoClip> {
        if !path.exists() {
            return Err(VideoError::LoadFailed { path: path.display().to_string() }.into());
        }

        let info = Self::probe(path)?;
        info!(
            "🎞️ Opened {:?}: {}x{} @ {:.2} fps, {:.2}s{}",
            path,
            info.width,
            info.height,
            info.fps,
            info.duration,
            if info.has_audio { ", with audio" } else { "" }
        );

        let audio = if info.has_audio {
            Some(Self::load_audio(path, audio_sample_rate)?)
        } else {
            None
        };

        Ok(VideoClip {
            node: Arc::new(ClipNode::File {
                path: path.to_path_buf(),
                size: (info.width, info.height),
                fps: info.fps,
            }),
            duration: info.duration,
            fps: info.fps,
            size: (info.width, info.height),
            audio,
            name: path.file_name().and_then(|n| n.to_str()).map(str::to_string),
        })
    }

    /// Query resolution, frame rate, duration and audio presence
    pub fn probe(path: &Path) -> Result<VideoInfo> {
        let load_failed = |reason: String| {
            debug!("Probe of {:?} failed: {}", path, reason);
            VideoError::LoadFailed { path: path.display().to_string() }
        };

        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate:format=duration"])
            .args(["-of", "default=noprint_wrappers=1"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|_| VideoError::FfmpegUnavailable)?;

        if !output.status.success() {
            return Err(load_failed(String::from_utf8_lossy(&output.stderr).to_string()).into());
        }

        let fields = parse_key_values(&String::from_utf8_lossy(&output.stdout));
        let number = |key: &str| fields.get(key).and_then(|v| v.parse::<f64>().ok());

        let width = number("width").ok_or_else(|| load_failed("no width".to_string()))? as u32;
        let height = number("height").ok_or_else(|| load_failed("no height".to_string()))? as u32;
        let fps = fields
            .get("r_frame_rate")
            .and_then(|v| parse_frame_rate(v))
            .unwrap_or(30.0);
        let duration = number("duration").ok_or_else(|| load_failed("no duration".to_string()))?;

        Ok(VideoInfo {
            width,
            height,
            fps,
            duration,
            has_audio: Self::has_audio_stream(path),
        })
    }

    fn has_audio_stream(path: &Path) -> bool {
        Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "a", "-show_entries", "stream=index", "-of", "csv=p=0"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map(|out| out.status.success() && !out.stdout.iter().all(u8::is_ascii_whitespace))
            .unwrap_or(false)
    }

    /// Decode the first audio stream as mono f32 at `sample_rate`
    pub fn load_audio(path: &Path, sample_rate: u32) -> Result<AudioData> {
        let output = Command::new("ffmpeg")
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-ac", "1", "-ar", &sample_rate.to_string(), "-f", "f32le", "-"])
            .stdin(Stdio::null())
            .output()
            .map_err(|_| VideoError::FfmpegUnavailable)?;

        if !output.status.success() {
            return Err(VideoError::DecodingFailed {
                reason: format!("FFmpeg failed: {}", String::from_utf8_lossy(&output.stderr)),
            }.into());
        }

        let samples = output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(AudioData::new(samples, sample_rate))
    }

    /// Check if a file extension is an openable video container
    pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
        matches!(
            extension_of(path.as_ref()).as_deref(),
            Some("mp4" | "mov" | "avi" | "mkv" | "webm")
        )
    }
}

fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Parse `30/1`, `30000/1001` or a plain number
fn parse_frame_rate(value: &str) -> Option<f64> {
    let fps = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse().ok()?,
    };
    (fps > 0.0 && fps.is_finite()).then_some(fps)
}

/// Sequential raw-frame reader over an `ffmpeg` child process
pub(crate) struct FrameDecoder {
    path: PathBuf,
    size: (u32, u32),
    fps: f64,
    process: Child,
    stdout: BufReader<ChildStdout>,
    /// Index of the next frame the pipe will yield
    next_index: usize,
    last: Option<(usize, Frame)>,
    exhausted: bool,
}

impl FrameDecoder {
    pub(crate) fn open(path: &Path, size: (u32, u32), fps: f64, start_index: usize) -> Result<Self> {
        let start = start_index as f64 / fps;
        debug!("Opening decoder for {:?} at frame {} ({:.3}s)", path, start_index, start);

        let mut process = Command::new("ffmpeg")
            .args(["-nostdin", "-v", "error", "-ss", &format!("{:.6}", start), "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", size.0, size.1)])
            .args(["-r", &fps.to_string(), "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|_| VideoError::FfmpegUnavailable)?;

        let stdout = process.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "Failed to capture FFmpeg stdout".to_string(),
        })?;
        let frame_size = (size.0 * size.1 * 3) as usize;

        Ok(Self {
            path: path.to_path_buf(),
            size,
            fps,
            process,
            stdout: BufReader::with_capacity(frame_size * 2, stdout),
            next_index: start_index,
            last: None,
            exhausted: false,
        })
    }

    /// Frame at `index`, holding the last decoded frame past the end of the stream
    pub(crate) fn frame(&mut self, index: usize) -> Result<Frame> {
        if let Some((last_index, frame)) = &self.last {
            if *last_index == index || (self.exhausted && index >= *last_index) {
                return Ok(frame.clone());
            }
        }

        if index < self.next_index {
            *self = Self::open(&self.path, self.size, self.fps, index)?;
        }

        while self.next_index <= index && !self.exhausted {
            match self.read_next()? {
                Some(frame) => {
                    self.last = Some((self.next_index, frame));
                    self.next_index += 1;
                }
                None => self.exhausted = true,
            }
        }

        match &self.last {
            Some((_, frame)) => Ok(frame.clone()),
            None => Err(VideoError::DecodingFailed {
                reason: format!("No frames decoded from {:?}", self.path),
            }.into()),
        }
    }

    fn read_next(&mut self) -> Result<Option<Frame>> {
        let mut buffer = vec![0u8; (self.size.0 * self.size.1 * 3) as usize];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => Ok(Frame::from_rgb_bytes(self.size.0, self.size.1, buffer)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(VideoError::DecodingFailed {
                reason: format!("Failed to read frame: {}", e),
            }.into()),
        }
    }
}

impl Drop for FrameDecoder {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
