//! Option values for each operation.
//!
//! These are already range-checked by the caller; the engine only re-checks
//! the few things that depend on the decoded image (crop bounds, format
//! names).

use serde::Deserialize;

use crate::codec::OutputFormat;
use crate::error::ProcessingError;

#[derive(Debug, Clone, PartialEq)]
pub struct CompressOptions {
    pub quality: u8,
    /// `None` keeps the source format (JPEG for anything not JPEG/PNG/WebP)
    pub format: Option<OutputFormat>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 80,
            format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    pub quality: u8,
}

impl ConvertOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            quality: 90,
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::new(OutputFormat::Jpeg)
    }
}

/// How a resize fits the source into the requested box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Cover the box, center-crop the overflow
    #[default]
    Cover,
    /// Fit inside the box and letterbox the remainder
    Contain,
    /// Stretch to the exact box
    Fill,
    Inside,
    Outside,
}

impl FitMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cover" => Some(FitMode::Cover),
            "contain" => Some(FitMode::Contain),
            "fill" => Some(FitMode::Fill),
            "inside" => Some(FitMode::Inside),
            "outside" => Some(FitMode::Outside),
            _ => None,
        }
    }
}

/// Clockwise right-angle rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ProcessingError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(ProcessingError::InvalidOption(format!(
                "Rotation must be 0, 90, 180 or 270 (got {})",
                other
            ))),
        }
    }
}

/// Rectangle to extract, in pixels of the image at crop time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    pub rotate: Option<Rotation>,
    pub flip: bool,
    pub flop: bool,
    pub crop: Option<CropRegion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl WatermarkPosition {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "center" => Some(WatermarkPosition::Center),
            "top" => Some(WatermarkPosition::Top),
            "bottom" => Some(WatermarkPosition::Bottom),
            "left" => Some(WatermarkPosition::Left),
            "right" => Some(WatermarkPosition::Right),
            "top-left" => Some(WatermarkPosition::TopLeft),
            "top-right" => Some(WatermarkPosition::TopRight),
            "bottom-left" => Some(WatermarkPosition::BottomLeft),
            "bottom-right" => Some(WatermarkPosition::BottomRight),
            _ => None,
        }
    }
}

/// An opaque RGB color parsed from `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor(pub [u8; 3]);

impl HexColor {
    pub const WHITE: HexColor = HexColor([255, 255, 255]);

    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(HexColor([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn with_alpha(self, alpha: u8) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, alpha])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: Option<String>,
    pub position: WatermarkPosition,
    /// 0.0 to 1.0
    pub opacity: f32,
    pub font_size: u32,
    pub font_color: HexColor,
    pub background_color: Option<HexColor>,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: None,
            position: WatermarkPosition::BottomRight,
            opacity: 0.8,
            font_size: 20,
            font_color: HexColor::WHITE,
            background_color: None,
        }
    }
}

/// Formats `remove_background` can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatteFormat {
    #[default]
    Png,
    Webp,
}

impl From<MatteFormat> for OutputFormat {
    fn from(format: MatteFormat) -> Self {
        match format {
            MatteFormat::Png => OutputFormat::Png,
            MatteFormat::Webp => OutputFormat::WebP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoveBackgroundOptions {
    pub output_format: MatteFormat,
    pub background_color: Option<HexColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceOptions {
    /// Upscale factor, 1.0 to 4.0
    pub scale: f32,
    pub denoise: bool,
    pub sharpen: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            denoise: true,
            sharpen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CompressOptions::default().quality, 80);
        assert_eq!(ConvertOptions::new(OutputFormat::Png).quality, 90);
        assert_eq!(TransformOptions::default().fit, FitMode::Cover);

        let wm = WatermarkOptions::default();
        assert_eq!(wm.position, WatermarkPosition::BottomRight);
        assert_eq!(wm.font_size, 20);
        assert!((wm.opacity - 0.8).abs() < f32::EPSILON);
        assert_eq!(wm.font_color, HexColor::WHITE);

        let enhance = EnhanceOptions::default();
        assert!(enhance.denoise && !enhance.sharpen);
        assert_eq!(
            RemoveBackgroundOptions::default().output_format,
            MatteFormat::Png
        );
    }

    #[test]
    fn test_hex_color_parse() {
        assert_eq!(HexColor::parse("#FF8000"), Some(HexColor([255, 128, 0])));
        assert_eq!(HexColor::parse("#ff8000"), Some(HexColor([255, 128, 0])));
        assert_eq!(HexColor::parse("FF8000"), None);
        assert_eq!(HexColor::parse("#FFF"), None);
        assert_eq!(HexColor::parse("#GG0000"), None);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::try_from(270).unwrap(), Rotation::Deg270);
        assert!(matches!(
            Rotation::try_from(45),
            Err(ProcessingError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_position_and_fit_deserialize() {
        let pos: WatermarkPosition = serde_json::from_str("\"top-left\"").unwrap();
        assert_eq!(pos, WatermarkPosition::TopLeft);
        assert_eq!(WatermarkPosition::parse("bottom-right"), Some(WatermarkPosition::BottomRight));

        let fit: FitMode = serde_json::from_str("\"outside\"").unwrap();
        assert_eq!(fit, FitMode::Outside);
        assert_eq!(FitMode::parse("sideways"), None);
    }
}
