use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use imageproc::filter::median_filter;

use super::resize::check_output_size;
use crate::error::ProcessingError;
use crate::options::EnhanceOptions;

/// Largest factor an upscaler is asked for
pub const MAX_SCALE: f32 = 4.0;

/// Resolution enhancement capability.
///
/// Same thread-safety contract as [`super::BackgroundRemover`].
pub trait Upscaler: Send + Sync {
    fn name(&self) -> &'static str;

    fn upscale(
        &self,
        img: &DynamicImage,
        options: &EnhanceOptions,
    ) -> Result<DynamicImage, ProcessingError>;
}

/// Plain resampling upscaler: Lanczos3, then optional unsharp mask and 3×3 median.
#[derive(Debug, Clone, Copy)]
pub struct LanczosUpscaler {
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
}

impl Default for LanczosUpscaler {
    fn default() -> Self {
        Self {
            sharpen_sigma: 1.0,
            sharpen_threshold: 1,
        }
    }
}

impl LanczosUpscaler {
    pub fn target_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
        let scale = scale.clamp(1.0, MAX_SCALE) as f64;
        (
            ((width as f64 * scale).round() as u32).max(1),
            ((height as f64 * scale).round() as u32).max(1),
        )
    }

    fn denoise(img: DynamicImage) -> DynamicImage {
        if img.color().has_alpha() {
            DynamicImage::ImageRgba8(median_filter(&img.to_rgba8(), 1, 1))
        } else {
            DynamicImage::ImageRgb8(median_filter(&img.to_rgb8(), 1, 1))
        }
    }
}

impl Upscaler for LanczosUpscaler {
    fn name(&self) -> &'static str {
        "lanczos"
    }

    fn upscale(
        &self,
        img: &DynamicImage,
        options: &EnhanceOptions,
    ) -> Result<DynamicImage, ProcessingError> {
        let (width, height) = img.dimensions();
        let (target_w, target_h) = Self::target_dimensions(width, height, options.scale);
        check_output_size(target_w, target_h)?;

        tracing::debug!(
            upscaler = self.name(),
            from = ?(width, height),
            to = ?(target_w, target_h),
            sharpen = options.sharpen,
            denoise = options.denoise,
            "Upscaling image"
        );

        let mut result = img.resize_exact(target_w, target_h, FilterType::Lanczos3);

        if options.sharpen {
            result = result.unsharpen(self.sharpen_sigma, self.sharpen_threshold);
        }

        if options.denoise {
            result = Self::denoise(result);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_target_dimensions_round() {
        assert_eq!(LanczosUpscaler::target_dimensions(100, 100, 2.0), (200, 200));
        assert_eq!(LanczosUpscaler::target_dimensions(3, 5, 1.5), (5, 8));
        assert_eq!(LanczosUpscaler::target_dimensions(10, 10, 9.0), (40, 40));
    }

    #[test]
    fn test_upscale_doubles_and_keeps_color_type() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 6, Rgb([90, 90, 90])));
        let out = LanczosUpscaler::default()
            .upscale(
                &img,
                &EnhanceOptions {
                    scale: 2.0,
                    denoise: true,
                    sharpen: true,
                },
            )
            .unwrap();
        assert_eq!(out.dimensions(), (20, 12));
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn test_upscale_past_pixel_limit_fails() {
        // 2600×2600 at 4× is 10400×10400
        let img = DynamicImage::ImageRgb8(RgbImage::new(2600, 2600));
        let err = LanczosUpscaler::default().upscale(
            &img,
            &EnhanceOptions {
                scale: 4.0,
                denoise: false,
                sharpen: false,
            },
        );
        assert!(matches!(err, Err(ProcessingError::Internal(_))));
    }

    #[test]
    fn test_median_removes_isolated_speck() {
        let mut base = RgbImage::from_pixel(5, 5, Rgb([0, 0, 0]));
        base.put_pixel(2, 2, Rgb([255, 255, 255]));
        let cleaned = LanczosUpscaler::denoise(DynamicImage::ImageRgb8(base)).to_rgb8();
        assert_eq!(cleaned.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }
}
