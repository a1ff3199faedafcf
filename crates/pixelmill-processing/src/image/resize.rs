use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::error::ProcessingError;
use crate::options::FitMode;

const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Largest buffer a resize or upscale may produce (10000×10000)
pub const MAX_OUTPUT_PIXELS: u64 = 100_000_000;

/// Reject a resample target before anything is allocated for it
pub fn check_output_size(width: u32, height: u32) -> Result<(), ProcessingError> {
    let pixels = width as u64 * height as u64;
    if pixels > MAX_OUTPUT_PIXELS {
        return Err(ProcessingError::Internal(format!(
            "Output of {}x{} exceeds the {} pixel limit",
            width, height, MAX_OUTPUT_PIXELS
        )));
    }
    Ok(())
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Derive the missing side from the source aspect ratio
    pub fn derive_dimensions(
        orig_width: u32,
        orig_height: u32,
        width: Option<u32>,
        height: Option<u32>,
    ) -> (u32, u32) {
        match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let aspect_ratio = orig_height as f64 / orig_width as f64;
                let h = (w as f64 * aspect_ratio).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let aspect_ratio = orig_width as f64 / orig_height as f64;
                let w = (h as f64 * aspect_ratio).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    /// Smallest aspect-preserving size that covers `width`×`height`
    pub fn outside_dimensions(
        orig_width: u32,
        orig_height: u32,
        width: u32,
        height: u32,
    ) -> (u32, u32) {
        let scale = (width as f64 / orig_width as f64).max(height as f64 / orig_height as f64);
        (
            ((orig_width as f64 * scale).round() as u32).max(1),
            ((orig_height as f64 * scale).round() as u32).max(1),
        )
    }

    /// Resize `img` toward the requested box using `fit`.
    ///
    /// With a single dimension the other is derived from the aspect ratio and
    /// every fit policy produces the same result. Targets larger than
    /// [`MAX_OUTPUT_PIXELS`] fail before resampling.
    pub fn apply(
        img: DynamicImage,
        width: Option<u32>,
        height: Option<u32>,
        fit: FitMode,
    ) -> Result<DynamicImage, ProcessingError> {
        let (orig_width, orig_height) = img.dimensions();

        let (w, h) = match (width, height) {
            (None, None) => return Ok(img),
            (Some(_), Some(_)) => Self::derive_dimensions(orig_width, orig_height, width, height),
            _ => {
                let (w, h) = Self::derive_dimensions(orig_width, orig_height, width, height);
                check_output_size(w, h)?;
                return Ok(img.resize_exact(w, h, RESIZE_FILTER));
            }
        };

        check_output_size(w, h)?;
        // Cover scales to the covering size before cropping to the box
        let covering = Self::outside_dimensions(orig_width, orig_height, w, h);
        if matches!(fit, FitMode::Cover | FitMode::Outside) {
            check_output_size(covering.0, covering.1)?;
        }

        tracing::debug!(
            from_width = orig_width,
            from_height = orig_height,
            box_width = w,
            box_height = h,
            fit = ?fit,
            "Resizing image"
        );

        let resized = match fit {
            FitMode::Cover => img.resize_to_fill(w, h, RESIZE_FILTER),
            FitMode::Contain => Self::letterbox(&img, w, h),
            FitMode::Fill => img.resize_exact(w, h, RESIZE_FILTER),
            FitMode::Inside => img.resize(w, h, RESIZE_FILTER),
            FitMode::Outside => img.resize_exact(covering.0, covering.1, RESIZE_FILTER),
        };
        Ok(resized)
    }

    /// Scale to fit inside the box and center on a `w`×`h` canvas.
    ///
    /// The canvas is transparent for sources with alpha and opaque black
    /// otherwise. This differs from sharp's `contain`, which always pads
    /// with opaque black.
    fn letterbox(img: &DynamicImage, w: u32, h: u32) -> DynamicImage {
        let has_alpha = img.color().has_alpha();
        let scaled = img.resize(w, h, RESIZE_FILTER);
        let (sw, sh) = scaled.dimensions();

        let bg = if has_alpha {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 0, 255])
        };
        let mut canvas = RgbaImage::from_pixel(w, h, bg);

        let x_offset = (w.saturating_sub(sw) / 2) as i64;
        let y_offset = (h.saturating_sub(sh) / 2) as i64;
        imageops::overlay(&mut canvas, &scaled.to_rgba8(), x_offset, y_offset);

        if has_alpha {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        }
    }
}
