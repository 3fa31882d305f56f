use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::video::types::Frame;

/// Brightness, contrast and saturation enhancement factors.
///
/// Each factor interpolates between a degenerate image and the original:
/// 1.0 leaves the frame unchanged, 0.0 gives the degenerate image (black for
/// brightness, the mean grey for contrast, the greyscale frame for
/// saturation) and values above 1.0 extrapolate away from it. They are applied
/// in the order brightness, contrast, saturation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorAdjustment {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// ITU-R 601 luma, as used for 8-bit greyscale conversion
fn luma(pixel: &[u8]) -> f32 {
    (pixel[0] as f32 * 299.0 + pixel[1] as f32 * 587.0 + pixel[2] as f32 * 114.0) / 1000.0
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

impl ColorAdjustment {
    pub fn new(brightness: f32, contrast: f32, saturation: f32) -> Self {
        Self { brightness, contrast, saturation }
    }

    /// All factors finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.brightness, self.contrast, self.saturation]
            .iter()
            .all(|f| f.is_finite() && *f >= 0.0)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Enhance a frame in place
    pub fn apply(&self, frame: &mut Frame) {
        if self.is_identity() {
            return;
        }

        let raw: &mut [u8] = frame.as_image_mut();

        if self.brightness != 1.0 {
            let factor = self.brightness;
            raw.par_iter_mut().for_each(|c| *c = to_u8(*c as f32 * factor));
        }

        if self.contrast != 1.0 {
            let pixels = (raw.len() / 3).max(1);
            let total: f64 = raw.par_chunks(3).map(|p| luma(p) as f64).sum();
            let mean = (total / pixels as f64).round() as f32;
            let factor = self.contrast;
            raw.par_iter_mut()
                .for_each(|c| *c = to_u8(mean + factor * (*c as f32 - mean)));
        }

        if self.saturation != 1.0 {
            let factor = self.saturation;
            raw.par_chunks_mut(3).for_each(|p| {
                let grey = luma(p).round();
                for c in p.iter_mut() {
                    *c = to_u8(grey + factor * (*c as f32 - grey));
                }
            });
        }
    }
}
