use image::{imageops, DynamicImage, RgbaImage};

use crate::error::ProcessingError;
use crate::options::HexColor;

/// Produces an alpha matte separating subject from background.
///
/// Implementations must be deterministic and free of shared mutable state;
/// the engine calls them from many blocking threads at once.
pub trait BackgroundRemover: Send + Sync {
    fn name(&self) -> &'static str;

    fn remove(&self, img: &DynamicImage) -> Result<RgbaImage, ProcessingError>;
}

/// Treats near-white pixels as background.
///
/// A pixel whose R, G and B are all strictly above `threshold` becomes fully
/// transparent; every other pixel is left untouched.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdMatte {
    pub threshold: u8,
}

impl Default for ThresholdMatte {
    fn default() -> Self {
        Self { threshold: 240 }
    }
}

impl BackgroundRemover for ThresholdMatte {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn remove(&self, img: &DynamicImage) -> Result<RgbaImage, ProcessingError> {
        let mut rgba = img.to_rgba8();
        let t = self.threshold;
        let mut cleared = 0usize;

        for pixel in rgba.pixels_mut() {
            if pixel[0] > t && pixel[1] > t && pixel[2] > t {
                pixel[3] = 0;
                cleared += 1;
            }
        }

        tracing::debug!(
            remover = self.name(),
            cleared_pixels = cleared,
            total_pixels = rgba.width() as usize * rgba.height() as usize,
            "Applied background matte"
        );

        Ok(rgba)
    }
}

/// Flatten `matte` over an opaque canvas of `color`
pub fn composite_over(matte: &RgbaImage, color: HexColor) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(matte.width(), matte.height(), color.with_alpha(255));
    imageops::overlay(&mut canvas, matte, 0, 0);
    canvas
}
