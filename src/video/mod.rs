//! # Video Module
//!
//! Clip handles over a lazy frame graph, plus the operations built on them:
//! color adjustment, speed change, fades, trimming, text overlays and audio
//! extraction. Decoding and encoding go through the `ffmpeg`/`ffprobe`
//! binaries; frames are only produced when a clip is rendered or encoded.

pub mod color;
pub mod encoder;
pub mod enhancer;
pub mod graph;
pub mod loader;
pub mod text;
pub mod types;

pub use color::ColorAdjustment;
pub use encoder::VideoEncoder;
pub use enhancer::{VideoEnhancer, DEFAULT_WATERMARK_POSITION};
pub use graph::FrameRenderer;
pub use loader::{VideoInfo, VideoLoader};
pub use text::{anchor_offset, TextLayer, TextRenderer, TextStyle};
pub use types::{Frame, HorizontalAnchor, Position, VerticalAnchor, VideoClip, VideoInput, VideoOutput};
