use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use image::{imageops, ImageBuffer, Rgb, RgbImage};
use rayon::prelude::*;

use crate::audio::AudioData;
use crate::error::VideoError;
use crate::output::base_name;
use crate::video::graph::ClipNode;

/// A single RGB video frame
///
/// This is a thin wrapper around an RGB image buffer with the pixel
/// operations the clip graph needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Raw interleaved RGB bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Resample to `width` x `height`
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.size() == (width, height) {
            return self.clone();
        }
        Frame::new(imageops::resize(&self.buffer, width, height, imageops::FilterType::Triangle))
    }

    /// Scale every channel by `factor` (0.0 gives black)
    pub fn dim(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        if factor >= 1.0 {
            return;
        }
        let raw: &mut [u8] = &mut self.buffer;
        raw.par_iter_mut().for_each(|channel| {
            *channel = (*channel as f32 * factor).round() as u8;
        });
    }

    /// Linear blend towards `other`; `alpha = 0` keeps `self`, `alpha = 1` gives `other`
    pub fn blend(&self, other: &Frame, alpha: f32) -> Frame {
        let alpha = alpha.clamp(0.0, 1.0);
        let other = other.resized(self.width(), self.height());
        let mut blended = self.clone();
        let raw: &mut [u8] = &mut blended.buffer;
        raw.par_iter_mut()
            .zip(other.as_rgb_bytes().par_iter())
            .for_each(|(a, &b)| {
                *a = (*a as f32 * (1.0 - alpha) + b as f32 * alpha).round().clamp(0.0, 255.0) as u8;
            });
        blended
    }
}

/// Horizontal placement of an overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Vertical placement of an overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Center,
    Bottom,
}

/// Overlay position as a `(horizontal, vertical)` anchor pair
pub type Position = (HorizontalAnchor, VerticalAnchor);

impl FromStr for HorizontalAnchor {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(VideoError::InvalidParameters {
                details: format!("Unknown horizontal position: {}", other),
            }),
        }
    }
}

impl FromStr for VerticalAnchor {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" | "centre" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(VideoError::InvalidParameters {
                details: format!("Unknown vertical position: {}", other),
            }),
        }
    }
}

/// In-memory video clip handle.
///
/// Frames are produced lazily from a graph of sources and transforms; the
/// handle itself only carries the timeline metadata and the attached audio.
/// Every transform returns a new handle, leaving this one untouched.
#[derive(Debug, Clone)]
pub struct VideoClip {
    pub(crate) node: Arc<ClipNode>,
    pub(crate) duration: f64,
    pub(crate) fps: f64,
    pub(crate) size: (u32, u32),
    pub(crate) audio: Option<AudioData>,
    pub(crate) name: Option<String>,
}

impl VideoClip {
    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Resolution (width, height)
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.0
    }

    pub fn height(&self) -> u32 {
        self.size.1
    }

    /// Attached audio track, if any
    pub fn audio(&self) -> Option<&AudioData> {
        self.audio.as_ref()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Name of the file this clip was loaded from, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of frames when sampled at `fps`
    pub fn frame_count_at(&self, fps: f64) -> usize {
        ((self.duration * fps).round() as usize).max(1)
    }

    /// Same clip with `audio` attached, replacing any previous track
    pub fn with_audio(&self, audio: AudioData) -> VideoClip {
        VideoClip { audio: Some(audio), ..self.clone() }
    }

    pub fn without_audio(&self) -> VideoClip {
        VideoClip { audio: None, ..self.clone() }
    }

    /// Same clip sampled at a different frame rate
    pub fn with_fps(&self, fps: f64) -> VideoClip {
        VideoClip { fps, ..self.clone() }
    }
}

/// A video operation's input: a file still to be opened, or a clip produced
/// by an earlier step
#[derive(Debug, Clone)]
pub enum VideoInput {
    File(PathBuf),
    Clip(VideoClip),
}

impl VideoInput {
    /// Base name used for files derived from this input
    pub fn base_name(&self) -> String {
        match self {
            Self::File(path) => base_name(path, "clip"),
            Self::Clip(clip) => clip
                .name()
                .map(|name| base_name(Path::new(name), "clip"))
                .unwrap_or_else(|| "clip".to_string()),
        }
    }
}

impl From<PathBuf> for VideoInput {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for VideoInput {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<&str> for VideoInput {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<String> for VideoInput {
    fn from(path: String) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<VideoClip> for VideoInput {
    fn from(clip: VideoClip) -> Self {
        Self::Clip(clip)
    }
}

impl From<&VideoClip> for VideoInput {
    fn from(clip: &VideoClip) -> Self {
        Self::Clip(clip.clone())
    }
}

impl From<VideoOutput> for VideoInput {
    fn from(output: VideoOutput) -> Self {
        match output {
            VideoOutput::Saved(path) => Self::File(path),
            VideoOutput::Clip(clip) => Self::Clip(clip),
        }
    }
}

/// Result of a video operation
#[derive(Debug, Clone)]
pub enum VideoOutput {
    /// Encoded to this file
    Saved(PathBuf),

    /// Kept in memory for chaining
    Clip(VideoClip),
}

impl VideoOutput {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved(path) => Some(path),
            Self::Clip(_) => None,
        }
    }

    pub fn clip(&self) -> Option<&VideoClip> {
        match self {
            Self::Saved(_) => None,
            Self::Clip(clip) => Some(clip),
        }
    }

    pub fn into_clip(self) -> Option<VideoClip> {
        match self {
            Self::Saved(_) => None,
            Self::Clip(clip) => Some(clip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new_filled(100, 50, [255, 0, 0]);
        assert_eq!(frame.size(), (100, 50));
        assert_eq!(frame.get_pixel(10, 10), [255, 0, 0]);
        assert_eq!(frame.as_rgb_bytes().len(), 100 * 50 * 3);
    }

    #[test]
    fn test_blend_endpoints_and_midpoint() {
        let a = Frame::new_filled(2, 1, [100, 150, 200]);
        let b = Frame::new_filled(2, 1, [0, 50, 0]);

        assert_eq!(a.blend(&b, 0.0), a);
        assert_eq!(a.blend(&b, 1.0), b);
        assert_eq!(a.blend(&b, 0.5).get_pixel(1, 0), [50, 100, 100]);
    }

    #[test]
    fn test_dim_to_black() {
        let mut frame = Frame::new_filled(4, 4, [200, 100, 50]);
        frame.dim(0.5);
        assert_eq!(frame.get_pixel(0, 0), [100, 50, 25]);
        frame.dim(0.0);
        assert_eq!(frame, Frame::new_black(4, 4));
    }

    #[test]
    fn test_resize() {
        let frame = Frame::new_filled(320, 240, [10, 20, 30]);
        let resized = frame.resized(1280, 720);
        assert_eq!(resized.size(), (1280, 720));
        assert_eq!(resized.get_pixel(640, 360), [10, 20, 30]);
    }

    #[test]
    fn test_anchor_parsing() {
        assert_eq!("right".parse::<HorizontalAnchor>().unwrap(), HorizontalAnchor::Right);
        assert_eq!("Bottom".parse::<VerticalAnchor>().unwrap(), VerticalAnchor::Bottom);
        assert!("middle".parse::<HorizontalAnchor>().is_err());
    }

    #[test]
    fn test_input_base_names() {
        assert_eq!(VideoInput::from("/videos/intro.mp4").base_name(), "intro");
        let clip = VideoClip::solid([0, 0, 0], (16, 16), 1.0, 24.0);
        assert_eq!(VideoInput::from(clip).base_name(), "clip");
    }
}
