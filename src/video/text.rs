//! Text overlay rendering for watermarks and subtitles.
//!
//! Text is rasterised once into an RGBA layer which the clip graph then
//! composites onto every frame.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::types::{Frame, HorizontalAnchor, Position, VerticalAnchor};

/// Fonts probed when none is configured
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// How a piece of text is drawn
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Glyph height in pixels
    pub font_size: f32,
    pub color: [u8; 3],
    /// Outline drawn around each glyph
    pub stroke: Option<[u8; 3]>,
    /// Opaque box behind the text
    pub background: Option<[u8; 3]>,
    /// Fixed layer size; the text is centered inside it
    pub box_size: Option<(u32, u32)>,
}

impl TextStyle {
    /// White 40px text with a black outline
    pub fn watermark() -> Self {
        Self {
            font_size: 40.0,
            color: [255, 255, 255],
            stroke: Some([0, 0, 0]),
            background: None,
            box_size: None,
        }
    }

    /// White 35px text on a black band `width` x 80px
    pub fn subtitle(width: u32) -> Self {
        Self {
            font_size: 35.0,
            color: [255, 255, 255],
            stroke: None,
            background: Some([0, 0, 0]),
            box_size: Some((width, 80)),
        }
    }
}

/// Rasterised text with per-pixel alpha
#[derive(Debug, Clone)]
pub struct TextLayer {
    image: RgbaImage,
}

impl TextLayer {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Alpha-composite onto `frame` with the layer's top-left at `(x, y)`.
    /// Parts falling outside the frame are clipped.
    pub fn composite_onto(&self, frame: &mut Frame, x: i64, y: i64) {
        let (frame_w, frame_h) = frame.size();
        let canvas = frame.as_image_mut();

        for (lx, ly, pixel) in self.image.enumerate_pixels() {
            let alpha = pixel[3] as f32 / 255.0;
            if alpha <= 0.0 {
                continue;
            }
            let fx = x + lx as i64;
            let fy = y + ly as i64;
            if fx < 0 || fy < 0 || fx >= frame_w as i64 || fy >= frame_h as i64 {
                continue;
            }
            let target = canvas.get_pixel_mut(fx as u32, fy as u32);
            for c in 0..3 {
                let blended = target[c] as f32 * (1.0 - alpha) + pixel[c] as f32 * alpha;
                target[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Top-left offset placing a `layer`-sized box inside a `frame`-sized area
pub fn anchor_offset(frame: (u32, u32), layer: (u32, u32), position: Position) -> (i64, i64) {
    let (fw, fh) = (frame.0 as i64, frame.1 as i64);
    let (lw, lh) = (layer.0 as i64, layer.1 as i64);

    let x = match position.0 {
        HorizontalAnchor::Left => 0,
        HorizontalAnchor::Center => (fw - lw) / 2,
        HorizontalAnchor::Right => fw - lw,
    };
    let y = match position.1 {
        VerticalAnchor::Top => 0,
        VerticalAnchor::Center => (fh - lh) / 2,
        VerticalAnchor::Bottom => fh - lh,
    };
    (x, y)
}

/// Renders text with a TrueType font, or with block glyphs when no font can
/// be found
pub struct TextRenderer {
    font: Option<Font<'static>>,
}

impl TextRenderer {
    /// Load `font_path`, or the first available system font when `None`
    pub fn new(font_path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(path) => vec![path.to_path_buf()],
            None => FALLBACK_FONTS.iter().map(PathBuf::from).collect(),
        };

        let font = candidates.iter().find_map(|path| {
            let bytes = std::fs::read(path).ok()?;
            let font = Font::try_from_vec(bytes)?;
            debug!("Using font {:?}", path);
            Some(font)
        });

        if font.is_none() {
            warn!("⚠️ No usable TrueType font found, text overlays will use block glyphs");
        }

        Self { font }
    }

    /// Renderer that always uses block glyphs
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Rasterise `text` into a layer
    pub fn render(&self, text: &str, style: &TextStyle) -> Result<TextLayer> {
        if text.trim().is_empty() {
            return Err(VideoError::InvalidParameters {
                details: "Text content cannot be empty".to_string(),
            }.into());
        }

        let stroke_width = if style.stroke.is_some() { 2 } else { 0 };
        let (text_w, text_h) = self.measure(text, style.font_size);
        let (layer_w, layer_h) = style
            .box_size
            .unwrap_or((text_w + 2 * stroke_width, text_h + 2 * stroke_width));
        let (layer_w, layer_h) = (layer_w.max(1), layer_h.max(1));

        let mut image = RgbaImage::new(layer_w, layer_h);
        if let Some(bg) = style.background {
            draw_filled_rect_mut(
                &mut image,
                Rect::at(0, 0).of_size(layer_w, layer_h),
                Rgba([bg[0], bg[1], bg[2], 255]),
            );
        }

        let origin_x = (layer_w as i32 - text_w as i32) / 2;
        let origin_y = (layer_h as i32 - text_h as i32) / 2;

        if let Some(stroke) = style.stroke {
            let offset = stroke_width as i32;
            for dy in -offset..=offset {
                for dx in -offset..=offset {
                    if dx != 0 || dy != 0 {
                        self.draw(&mut image, text, style.font_size, stroke, origin_x + dx, origin_y + dy);
                    }
                }
            }
        }
        self.draw(&mut image, text, style.font_size, style.color, origin_x, origin_y);

        Ok(TextLayer { image })
    }

    fn measure(&self, text: &str, font_size: f32) -> (u32, u32) {
        match &self.font {
            Some(font) => {
                let (w, h) = text_size(Scale::uniform(font_size), font, text);
                (w.max(1) as u32, (h.max(font_size as i32)).max(1) as u32)
            }
            None => estimate_text_size(text, font_size),
        }
    }

    fn draw(&self, image: &mut RgbaImage, text: &str, font_size: f32, color: [u8; 3], x: i32, y: i32) {
        let rgba = Rgba([color[0], color[1], color[2], 255]);
        match &self.font {
            Some(font) => draw_text_mut(image, rgba, x, y, Scale::uniform(font_size), font, text),
            None => draw_block_glyphs(image, text, font_size, rgba, x, y),
        }
    }
}

/// Approximate size of `text` when each character is ~0.6 em wide
fn estimate_text_size(text: &str, font_size: f32) -> (u32, u32) {
    let chars = text.chars().count() as f32;
    let width = (chars * font_size * 0.6) as u32;
    (width.max(1), (font_size as u32).max(1))
}

/// One filled cell per visible character, with a one pixel gutter
fn draw_block_glyphs(image: &mut RgbaImage, text: &str, font_size: f32, color: Rgba<u8>, x: i32, y: i32) {
    let cell_w = ((font_size * 0.6) as i32).max(1);
    let cell_h = (font_size as i32).max(1);

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            continue;
        }
        let left = x + i as i32 * cell_w + 1;
        let width = (cell_w - 2).max(1) as u32;
        let height = (cell_h - 2).max(1) as u32;
        draw_filled_rect_mut(image, Rect::at(left, y + 1).of_size(width, height), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_offsets() {
        let frame = (1920, 1080);
        let layer = (100, 50);
        assert_eq!(anchor_offset(frame, layer, (HorizontalAnchor::Left, VerticalAnchor::Top)), (0, 0));
        assert_eq!(anchor_offset(frame, layer, (HorizontalAnchor::Center, VerticalAnchor::Center)), (910, 515));
        assert_eq!(anchor_offset(frame, layer, (HorizontalAnchor::Right, VerticalAnchor::Bottom)), (1820, 1030));
    }

    #[test]
    fn test_estimate_text_size() {
        let (w, h) = estimate_text_size("Test", 24.0);
        assert_eq!(h, 24);
        assert!(w > 0 && w < 100);
    }

    #[test]
    fn test_subtitle_band_has_fixed_size() {
        let renderer = TextRenderer::without_font();
        let layer = renderer.render("Hello", &TextStyle::subtitle(320)).unwrap();
        assert_eq!(layer.size(), (320, 80));
    }

    #[test]
    fn test_empty_text_rejected() {
        let renderer = TextRenderer::without_font();
        assert!(renderer.render("   ", &TextStyle::watermark()).is_err());
    }

    #[test]
    fn test_subtitle_band_composites_black() {
        let renderer = TextRenderer::without_font();
        let layer = renderer.render("Hi", &TextStyle::subtitle(64)).unwrap();

        let mut frame = Frame::new_filled(64, 120, [255, 0, 0]);
        let (x, y) = anchor_offset(frame.size(), layer.size(), (HorizontalAnchor::Center, VerticalAnchor::Bottom));
        layer.composite_onto(&mut frame, x, y);

        // Above the band untouched, band corner black
        assert_eq!(frame.get_pixel(0, 0), [255, 0, 0]);
        assert_eq!(frame.get_pixel(0, 119), [0, 0, 0]);
    }

    #[test]
    fn test_watermark_draws_white_and_stroke() {
        let renderer = TextRenderer::without_font();
        let layer = renderer.render("AB", &TextStyle::watermark()).unwrap();

        let mut frame = Frame::new_filled(200, 100, [0, 0, 255]);
        let (x, y) = anchor_offset(frame.size(), layer.size(), (HorizontalAnchor::Right, VerticalAnchor::Bottom));
        layer.composite_onto(&mut frame, x, y);

        let pixels: Vec<[u8; 3]> = frame.as_rgb_bytes().chunks(3).map(|p| [p[0], p[1], p[2]]).collect();
        assert!(pixels.contains(&[255, 255, 255]));
        assert!(pixels.contains(&[0, 0, 0]));
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 255]);
    }

    #[test]
    fn test_layer_clipped_at_frame_edges() {
        let renderer = TextRenderer::without_font();
        let layer = renderer.render("Wide text", &TextStyle::subtitle(400)).unwrap();
        let mut frame = Frame::new_filled(100, 100, [10, 10, 10]);
        layer.composite_onto(&mut frame, -150, 20);
        assert_eq!(frame.get_pixel(50, 21), [0, 0, 0]);
        assert_eq!(frame.get_pixel(50, 10), [10, 10, 10]);
    }
}
