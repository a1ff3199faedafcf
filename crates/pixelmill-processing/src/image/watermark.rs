//! Text watermarking with a scaled 8×8 bitmap font.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::error::ProcessingError;
use crate::options::{WatermarkOptions, WatermarkPosition};

/// Distance kept between the text box and the image edge
const EDGE_MARGIN: i64 = 10;
/// Padding of the optional background plate around the text box
const PLATE_PAD_X: i64 = 10;
const PLATE_PAD_Y: i64 = 5;

/// Pixel size of rendered text for a given font size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub scale: u32,
    pub width: u32,
    pub height: u32,
}

pub struct TextWatermark;

impl TextWatermark {
    /// Integer glyph scale for a requested font size (8px glyph cells)
    pub fn scale_for(font_size: u32) -> u32 {
        ((font_size as f32 / 8.0).round() as u32).max(1)
    }

    /// Measure `text` as drawn at `font_size`: glyphs are `8*scale` wide with
    /// a `scale` gap between neighbours.
    pub fn measure(text: &str, font_size: u32) -> TextMetrics {
        let scale = Self::scale_for(font_size);
        let n = text.chars().count() as u32;
        let width = if n == 0 {
            0
        } else {
            n * 8 * scale + (n - 1) * scale
        };
        TextMetrics {
            scale,
            width,
            height: 8 * scale,
        }
    }

    /// Top-left corner of the text box for `position` on a `width`×`height`
    /// canvas. May be negative when the text is larger than the image.
    pub fn anchor(
        position: WatermarkPosition,
        width: u32,
        height: u32,
        metrics: TextMetrics,
    ) -> (i64, i64) {
        let (w, h) = (width as i64, height as i64);
        let (tw, th) = (metrics.width as i64, metrics.height as i64);

        let center_x = (w - tw).div_euclid(2);
        let center_y = (h - th).div_euclid(2);
        let right = w - tw - EDGE_MARGIN;
        let bottom = h - th - EDGE_MARGIN;

        match position {
            WatermarkPosition::Center => (center_x, center_y),
            WatermarkPosition::Top => (center_x, EDGE_MARGIN),
            WatermarkPosition::Bottom => (center_x, bottom),
            WatermarkPosition::Left => (EDGE_MARGIN, center_y),
            WatermarkPosition::Right => (right, center_y),
            WatermarkPosition::TopLeft => (EDGE_MARGIN, EDGE_MARGIN),
            WatermarkPosition::TopRight => (right, EDGE_MARGIN),
            WatermarkPosition::BottomLeft => (EDGE_MARGIN, bottom),
            WatermarkPosition::BottomRight => (right, bottom),
        }
    }

    /// Rasterize `text` onto a transparent layer exactly `metrics` in size.
    pub fn render(text: &str, metrics: TextMetrics, color: Rgba<u8>) -> RgbaImage {
        let mut layer = RgbaImage::from_pixel(
            metrics.width.max(1),
            metrics.height.max(1),
            Rgba([0, 0, 0, 0]),
        );
        let scale = metrics.scale;
        let advance = 8 * scale + scale;

        for (idx, ch) in text.chars().enumerate() {
            let glyph = BASIC_FONTS
                .get(ch)
                .or_else(|| BASIC_FONTS.get('?'))
                .unwrap_or([0u8; 8]);
            let origin_x = idx as u32 * advance;

            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..8u32 {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let base_x = origin_x + col * scale;
                    let base_y = row as u32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let (px, py) = (base_x + dx, base_y + dy);
                            if px < layer.width() && py < layer.height() {
                                layer.put_pixel(px, py, color);
                            }
                        }
                    }
                }
            }
        }

        layer
    }

    /// Stamp the watermark text and return the composited RGBA canvas.
    ///
    /// After drawing, the alpha of every pixel is multiplied by `opacity`,
    /// so the whole output (not only the text) is faded.
    pub fn apply(
        img: &DynamicImage,
        options: &WatermarkOptions,
    ) -> Result<RgbaImage, ProcessingError> {
        let text = options
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProcessingError::MissingContent("No watermark text provided".to_string())
            })?;

        let opacity = options.opacity.clamp(0.0, 1.0);
        let mut canvas = img.to_rgba8();
        let (width, height) = canvas.dimensions();

        let metrics = Self::measure(text, options.font_size);
        let (x, y) = Self::anchor(options.position, width, height, metrics);

        tracing::debug!(
            text_width = metrics.width,
            text_height = metrics.height,
            scale = metrics.scale,
            x = x,
            y = y,
            "Placing watermark text"
        );

        if let Some(bg) = options.background_color {
            let plate = RgbaImage::from_pixel(
                metrics.width + 2 * PLATE_PAD_X as u32,
                metrics.height + 2 * PLATE_PAD_Y as u32,
                bg.with_alpha(Self::alpha_for(opacity)),
            );
            imageops::overlay(&mut canvas, &plate, x - PLATE_PAD_X, y - PLATE_PAD_Y);
        }

        let layer = Self::render(text, metrics, options.font_color.with_alpha(255));
        imageops::overlay(&mut canvas, &layer, x, y);

        Self::fade(&mut canvas, opacity);
        Ok(canvas)
    }

    fn alpha_for(opacity: f32) -> u8 {
        (opacity * 255.0).round() as u8
    }

    /// Multiply every pixel's alpha by `opacity`
    fn fade(canvas: &mut RgbaImage, opacity: f32) {
        if opacity >= 1.0 {
            return;
        }
        for pixel in canvas.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
    }
}
