//! Lazy clip graph.
//!
//! A [`VideoClip`] points at a tree of [`ClipNode`]s: sources (files, solid
//! colors) wrapped by per-frame filters, retiming and concatenation. Nothing
//! is decoded until a [`FrameRenderer`] asks for the frame at a timestamp,
//! which keeps every transform cheap and lets operations chain in memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::AudioData;
use crate::error::{Result, VideoError};
use crate::video::color::ColorAdjustment;
use crate::video::loader::FrameDecoder;
use crate::video::text::TextLayer;
use crate::video::types::{Frame, VideoClip};

/// Nudge applied before flooring `t * fps` so exact frame times land on
/// their own frame despite float error
const FRAME_EPSILON: f64 = 1e-6;

#[derive(Debug)]
pub(crate) enum ClipNode {
    /// Frames decoded from a file
    File { path: PathBuf, size: (u32, u32), fps: f64 },

    /// A single color
    Solid { color: [u8; 3], size: (u32, u32) },

    /// Per-frame pixel transform
    Filter { input: Arc<ClipNode>, filter: FrameFilter },

    /// Frame at `t` comes from the input at `offset + t * speed`
    Retime { input: Arc<ClipNode>, offset: f64, speed: f64 },

    /// `second` starts at `second_start`; the two overlap from there until
    /// `first_end`, blending linearly
    Concat {
        first: Arc<ClipNode>,
        second: Arc<ClipNode>,
        first_end: f64,
        second_start: f64,
    },
}

#[derive(Debug)]
pub(crate) enum FrameFilter {
    Color(ColorAdjustment),
    Resize { width: u32, height: u32 },
    Overlay { layer: Arc<TextLayer>, x: i64, y: i64 },
    /// Fade from and to black
    Fade { fade_in: f64, fade_out: f64, duration: f64 },
}

impl FrameFilter {
    fn apply(&self, frame: Frame, t: f64) -> Frame {
        match self {
            Self::Color(adjustment) => {
                let mut frame = frame;
                adjustment.apply(&mut frame);
                frame
            }
            Self::Resize { width, height } => frame.resized(*width, *height),
            Self::Overlay { layer, x, y } => {
                let mut frame = frame;
                layer.composite_onto(&mut frame, *x, *y);
                frame
            }
            Self::Fade { fade_in, fade_out, duration } => {
                let mut factor = 1.0f64;
                if *fade_in > 0.0 && t < *fade_in {
                    factor = factor.min(t / fade_in);
                }
                if *fade_out > 0.0 && t > duration - fade_out {
                    factor = factor.min((duration - t) / fade_out);
                }
                let mut frame = frame;
                frame.dim(factor.clamp(0.0, 1.0) as f32);
                frame
            }
        }
    }
}

/// Produces frames from a clip graph, keeping one decoder per file source
/// so sequential reads stay sequential
#[derive(Default)]
pub struct FrameRenderer {
    decoders: HashMap<(usize, u64), FrameDecoder>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame of `clip` at `t` seconds, clamped to the clip's timeline
    pub fn render(&mut self, clip: &VideoClip, t: f64) -> Result<Frame> {
        let t = t.clamp(0.0, clip.duration.max(0.0));
        let frame = self.render_node(&clip.node, t, 1)?;
        Ok(frame.resized(clip.size.0, clip.size.1))
    }

    /// `branch` distinguishes repeated uses of one source inside a concatenation
    fn render_node(&mut self, node: &Arc<ClipNode>, t: f64, branch: u64) -> Result<Frame> {
        match node.as_ref() {
            ClipNode::File { path, size, fps } => {
                let key = (Arc::as_ptr(node) as usize, branch);
                let index = (t * fps + FRAME_EPSILON).floor().max(0.0) as usize;
                if !self.decoders.contains_key(&key) {
                    let decoder = FrameDecoder::open(path, *size, *fps, index)?;
                    self.decoders.insert(key, decoder);
                }
                match self.decoders.get_mut(&key) {
                    Some(decoder) => decoder.frame(index),
                    None => Err(VideoError::DecodingFailed {
                        reason: format!("Decoder for {:?} unavailable", path),
                    }.into()),
                }
            }
            ClipNode::Solid { color, size } => Ok(Frame::new_filled(size.0, size.1, *color)),
            ClipNode::Filter { input, filter } => {
                let frame = self.render_node(input, t, branch)?;
                Ok(filter.apply(frame, t))
            }
            ClipNode::Retime { input, offset, speed } => {
                self.render_node(input, (offset + t * speed).max(0.0), branch)
            }
            ClipNode::Concat { first, second, first_end, second_start } => {
                if t < *second_start {
                    self.render_node(first, t, branch.wrapping_mul(2))
                } else if t >= *first_end {
                    self.render_node(second, t - second_start, branch.wrapping_mul(2) + 1)
                } else {
                    let outgoing = self.render_node(first, t, branch.wrapping_mul(2))?;
                    let incoming = self.render_node(second, t - second_start, branch.wrapping_mul(2) + 1)?;
                    let alpha = (t - second_start) / (first_end - second_start);
                    Ok(outgoing.blend(&incoming, alpha as f32))
                }
            }
        }
    }
}

fn invalid(details: String) -> VideoError {
    VideoError::InvalidParameters { details }
}

impl VideoClip {
    /// A clip showing one color for `duration` seconds
    pub fn solid(color: [u8; 3], size: (u32, u32), duration: f64, fps: f64) -> VideoClip {
        VideoClip {
            node: Arc::new(ClipNode::Solid { color, size }),
            duration,
            fps,
            size,
            audio: None,
            name: None,
        }
    }

    /// Render a single frame; handy for previews and checks
    pub fn frame_at(&self, t: f64) -> Result<Frame> {
        FrameRenderer::new().render(self, t)
    }

    fn filtered(&self, filter: FrameFilter) -> VideoClip {
        VideoClip {
            node: Arc::new(ClipNode::Filter { input: Arc::clone(&self.node), filter }),
            ..self.clone()
        }
    }

    /// Apply brightness/contrast/saturation factors to every frame
    pub fn adjusted(&self, adjustment: ColorAdjustment) -> Result<VideoClip> {
        if !adjustment.is_valid() {
            return Err(invalid(format!("Invalid color factors {:?}", adjustment)).into());
        }
        Ok(self.filtered(FrameFilter::Color(adjustment)))
    }

    /// Scale every frame to `width` x `height`
    pub fn resized(&self, width: u32, height: u32) -> Result<VideoClip> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("Invalid size {}x{}", width, height)).into());
        }
        let mut clip = self.filtered(FrameFilter::Resize { width, height });
        clip.size = (width, height);
        Ok(clip)
    }

    /// Composite a text layer at `(x, y)` on every frame
    pub fn with_overlay(&self, layer: TextLayer, x: i64, y: i64) -> VideoClip {
        self.filtered(FrameFilter::Overlay { layer: Arc::new(layer), x, y })
    }

    /// Fade from black over `fade_in` seconds and to black over the last
    /// `fade_out` seconds; the audio fades with the picture
    pub fn faded(&self, fade_in: f64, fade_out: f64) -> Result<VideoClip> {
        if !(fade_in >= 0.0 && fade_out >= 0.0) {
            return Err(invalid(format!("Invalid fade {} / {}", fade_in, fade_out)).into());
        }
        let fade_in = fade_in.min(self.duration);
        let fade_out = fade_out.min(self.duration);

        let mut clip = self.filtered(FrameFilter::Fade { fade_in, fade_out, duration: self.duration });
        clip.audio = self.audio.as_ref().map(|audio| {
            let faded = crate::audio::enhancer::apply_fade_in(audio, fade_in as f32);
            crate::audio::enhancer::apply_fade_out(&faded, fade_out as f32)
        });
        Ok(clip)
    }

    /// The part of the clip between `start` and `end` seconds (`None` runs to the end)
    pub fn subclip(&self, start: f64, end: Option<f64>) -> Result<VideoClip> {
        let end = end.unwrap_or(self.duration).min(self.duration);
        if !(start >= 0.0 && start < end) {
            return Err(invalid(format!(
                "Invalid trim range {}..{} for a {:.2}s clip",
                start, end, self.duration
            )).into());
        }

        let audio = self.audio.as_ref().map(|audio| {
            let from = audio.index_for_time(start).min(audio.len());
            let to = audio.index_for_time(end).clamp(from, audio.len());
            AudioData::new(audio.samples[from..to].to_vec(), audio.sample_rate)
        });

        Ok(VideoClip {
            node: Arc::new(ClipNode::Retime { input: Arc::clone(&self.node), offset: start, speed: 1.0 }),
            duration: end - start,
            audio,
            ..self.clone()
        })
    }

    /// Play `factor` times faster; the audio is resampled along with it
    pub fn speedx(&self, factor: f64) -> Result<VideoClip> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(invalid(format!("Speed factor must be a positive number, got {}", factor)).into());
        }

        Ok(VideoClip {
            node: Arc::new(ClipNode::Retime { input: Arc::clone(&self.node), offset: 0.0, speed: factor }),
            duration: self.duration / factor,
            audio: self.audio.as_ref().map(|audio| audio.varispeed(factor)),
            ..self.clone()
        })
    }

    /// Play `first` then `second`, overlapping the last `crossfade` seconds
    /// of `first` with the start of `second`.
    ///
    /// The result takes the geometry and frame rate of `first`. Audio of
    /// both clips is crossfaded the same way; a clip without audio
    /// contributes silence.
    pub fn concatenate(first: &VideoClip, second: &VideoClip, crossfade: f64) -> Result<VideoClip> {
        if !(crossfade >= 0.0) || crossfade > first.duration.min(second.duration) {
            return Err(invalid(format!(
                "Crossfade of {}s does not fit clips of {:.2}s and {:.2}s",
                crossfade, first.duration, second.duration
            )).into());
        }

        let second_start = first.duration - crossfade;
        let duration = second_start + second.duration;

        let second_node = if second.size == first.size {
            Arc::clone(&second.node)
        } else {
            Arc::new(ClipNode::Filter {
                input: Arc::clone(&second.node),
                filter: FrameFilter::Resize { width: first.size.0, height: first.size.1 },
            })
        };

        Ok(VideoClip {
            node: Arc::new(ClipNode::Concat {
                first: Arc::clone(&first.node),
                second: second_node,
                first_end: first.duration,
                second_start,
            }),
            duration,
            fps: first.fps,
            size: first.size,
            audio: concatenate_audio(first, second, crossfade),
            name: first.name.clone(),
        })
    }
}

fn concatenate_audio(first: &VideoClip, second: &VideoClip, crossfade: f64) -> Option<AudioData> {
    if first.audio.is_none() && second.audio.is_none() {
        return None;
    }

    let sample_rate = first
        .audio
        .as_ref()
        .or(second.audio.as_ref())
        .map(|audio| audio.sample_rate)
        .unwrap_or(44100);

    let track = |clip: &VideoClip| match &clip.audio {
        Some(audio) => audio.resampled(sample_rate),
        None => AudioData::silence(clip.duration, sample_rate),
    };

    let mut head = track(first);
    let mut tail = track(second);
    if crossfade > 0.0 {
        head = crate::audio::enhancer::apply_fade_out(&head, crossfade as f32);
        tail = crate::audio::enhancer::apply_fade_in(&tail, crossfade as f32);
    }

    let offset = ((first.duration - crossfade).max(0.0) * sample_rate as f64).round() as usize;
    let mut samples = head.samples;
    samples.resize(samples.len().max(offset + tail.len()), 0.0);
    for (i, s) in tail.samples.iter().enumerate() {
        samples[offset + i] = (samples[offset + i] + s).clamp(-1.0, 1.0);
    }
    samples.truncate(offset + tail.len());

    Some(AudioData::new(samples, sample_rate))
}
