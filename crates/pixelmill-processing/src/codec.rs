//! Decoding and encoding of image buffers
//!
//! Decoding always sniffs the container from the leading bytes. Encoding is
//! driven by a single format registry so every operation agrees on MIME
//! types, quality handling and fallbacks.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::error::ProcessingError;

/// Quality used when an operation re-encodes without an explicit quality
pub const DEFAULT_REENCODE_QUALITY: u8 = 80;

/// Target formats accepted by `compress` and `convert`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Tiff,
    Bmp,
}

/// Registry entry describing how a target format is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: OutputFormat,
    pub name: &'static str,
    pub mime: &'static str,
    /// Whether the quality option changes the encoder output
    pub quality_bearing: bool,
    /// Encoder actually used; differs from `format` for fallbacks
    pub encode_as: OutputFormat,
}

static FORMAT_REGISTRY: [FormatSpec; 6] = [
    FormatSpec {
        format: OutputFormat::Jpeg,
        name: "jpeg",
        mime: "image/jpeg",
        quality_bearing: true,
        encode_as: OutputFormat::Jpeg,
    },
    FormatSpec {
        format: OutputFormat::Png,
        name: "png",
        mime: "image/png",
        quality_bearing: true,
        encode_as: OutputFormat::Png,
    },
    FormatSpec {
        format: OutputFormat::WebP,
        name: "webp",
        mime: "image/webp",
        quality_bearing: true,
        encode_as: OutputFormat::WebP,
    },
    FormatSpec {
        format: OutputFormat::Avif,
        name: "avif",
        mime: "image/avif",
        quality_bearing: true,
        encode_as: OutputFormat::Avif,
    },
    FormatSpec {
        format: OutputFormat::Tiff,
        name: "tiff",
        mime: "image/tiff",
        quality_bearing: false,
        encode_as: OutputFormat::Tiff,
    },
    // No BMP encoder is exposed; requests for bmp are served as JPEG.
    FormatSpec {
        format: OutputFormat::Bmp,
        name: "bmp",
        mime: "image/jpeg",
        quality_bearing: true,
        encode_as: OutputFormat::Jpeg,
    },
];

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, ProcessingError> {
        let normalized = s.trim().to_lowercase();
        if normalized == "jpg" {
            return Ok(OutputFormat::Jpeg);
        }
        FORMAT_REGISTRY
            .iter()
            .find(|spec| spec.name == normalized)
            .map(|spec| spec.format)
            .ok_or_else(|| ProcessingError::UnsupportedFormat(s.to_string()))
    }

    pub fn spec(self) -> &'static FormatSpec {
        // Every variant has exactly one registry entry
        match FORMAT_REGISTRY.iter().find(|spec| spec.format == self) {
            Some(spec) => spec,
            None => &FORMAT_REGISTRY[0],
        }
    }

    /// Format the produced bytes are actually in
    pub fn resolved(self) -> OutputFormat {
        self.spec().encode_as
    }

    pub fn mime_type(self) -> &'static str {
        self.spec().mime
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Map a sniffed source container onto an encodable format, if any
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            ImageFormat::Tiff => Some(OutputFormat::Tiff),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            _ => None,
        }
    }

    pub fn all() -> impl Iterator<Item = OutputFormat> {
        FORMAT_REGISTRY.iter().map(|spec| spec.format)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded pixel grid together with the container it was sniffed as
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub source_format: ImageFormat,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Output format for operations that keep JPEG, PNG and WebP sources
    /// as they are and fall back to JPEG for everything else.
    pub fn compress_target(&self) -> OutputFormat {
        match OutputFormat::from_image_format(self.source_format) {
            Some(f @ (OutputFormat::Jpeg | OutputFormat::Png | OutputFormat::WebP)) => f,
            _ => OutputFormat::Jpeg,
        }
    }

    /// Output format for operations that also preserve TIFF sources.
    pub fn preserved_target(&self) -> OutputFormat {
        match OutputFormat::from_image_format(self.source_format) {
            Some(
                f @ (OutputFormat::Jpeg
                | OutputFormat::Png
                | OutputFormat::WebP
                | OutputFormat::Tiff),
            ) => f,
            _ => OutputFormat::Jpeg,
        }
    }
}

/// Decode raw bytes, recognizing the container from its content.
pub fn decode(data: &[u8]) -> Result<DecodedImage, ProcessingError> {
    if data.is_empty() {
        return Err(ProcessingError::Decode("empty input".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;

    let source_format = reader
        .format()
        .ok_or_else(|| ProcessingError::Decode("unrecognized image format".to_string()))?;

    let image = reader
        .decode()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;

    tracing::debug!(
        format = ?source_format,
        width = image.width(),
        height = image.height(),
        "Decoded image"
    );

    Ok(DecodedImage {
        image,
        source_format,
    })
}

/// Encode `img` as `format` at `quality` (1-100).
///
/// Returns the encoded bytes; the caller reports `format.resolved()` as the
/// produced format.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Bytes, ProcessingError> {
    let quality = quality.clamp(1, 100);
    let target = format.resolved();

    let data = match target {
        OutputFormat::Jpeg | OutputFormat::Bmp => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img, quality),
        OutputFormat::WebP => Ok(encode_webp(img, quality)),
        OutputFormat::Avif => encode_avif(img, quality),
        OutputFormat::Tiff => encode_tiff(img),
    }?;

    tracing::debug!(
        requested = %format,
        encoded_as = %target,
        quality = quality,
        size = data.len(),
        "Encoded image"
    );

    Ok(data)
}

/// Encode to JPEG using mozjpeg
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality as f32);
    comp.set_optimize_coding(true);

    let mut comp = comp
        .start_compress(Vec::new())
        .map_err(|e| ProcessingError::internal("encode jpeg", e))?;
    comp.write_scanlines(&rgb_img)
        .map_err(|e| ProcessingError::internal("encode jpeg", e))?;
    let jpeg_data = comp
        .finish()
        .map_err(|e| ProcessingError::internal("encode jpeg", e))?;

    Ok(Bytes::from(jpeg_data))
}

/// Map quality 1-100 onto the 1-10 zlib scale, then onto the encoder's presets.
pub(crate) fn png_compression_for_quality(quality: u8) -> CompressionType {
    let level = (quality as f32 / 10.0).round() as u8;
    match level {
        0..=3 => CompressionType::Fast,
        4..=7 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_png(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buffer,
        png_compression_for_quality(quality),
        PngFilter::Adaptive,
    );
    img.write_with_encoder(encoder)
        .map_err(|e| ProcessingError::internal("encode png", e))?;
    Ok(Bytes::from(buffer))
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Bytes {
    let (width, height) = img.dimensions();
    let rgba_img = img.to_rgba8();

    let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
    let webp_data = encoder.encode(quality as f32);

    Bytes::copy_from_slice(&webp_data)
}

fn encode_avif(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
    let (width, height) = img.dimensions();
    let rgba_img = img.to_rgba8();

    let pixels: Vec<rgb::RGBA8> = rgba_img
        .as_raw()
        .chunks_exact(4)
        .map(|c| rgb::RGBA8::new(c[0], c[1], c[2], c[3]))
        .collect();

    let img_buf = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);

    let encoder = ravif::Encoder::new()
        .with_quality(quality as f32)
        .with_speed(6);

    let encoded = encoder
        .encode_rgba(img_buf)
        .map_err(|e| ProcessingError::internal("encode avif", e))?;

    Ok(Bytes::from(encoded.avif_file))
}

fn encode_tiff(img: &DynamicImage) -> Result<Bytes, ProcessingError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    // The TIFF encoder only accepts 8-bit RGB(A) and luma layouts
    let normalized = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    normalized
        .write_to(&mut cursor, ImageFormat::Tiff)
        .map_err(|e| ProcessingError::internal("encode tiff", e))?;

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn test_parse_aliases_and_unknown() {
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("JPEG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("webp").unwrap(), OutputFormat::WebP);
        assert!(matches!(
            OutputFormat::parse("gif"),
            Err(ProcessingError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_bmp_falls_back_to_jpeg() {
        let spec = OutputFormat::Bmp.spec();
        assert_eq!(spec.encode_as, OutputFormat::Jpeg);
        assert_eq!(OutputFormat::Bmp.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::Bmp.resolved(), OutputFormat::Jpeg);
    }

    #[test]
    fn test_every_format_has_registry_entry() {
        for format in OutputFormat::all() {
            assert_eq!(format.spec().format, format);
        }
        assert!(!OutputFormat::Tiff.spec().quality_bearing);
    }

    #[test]
    fn test_png_compression_buckets() {
        assert_eq!(png_compression_for_quality(10), CompressionType::Fast);
        assert_eq!(png_compression_for_quality(34), CompressionType::Fast);
        assert_eq!(png_compression_for_quality(50), CompressionType::Default);
        assert_eq!(png_compression_for_quality(80), CompressionType::Best);
        assert_eq!(png_compression_for_quality(100), CompressionType::Best);
    }

    #[test]
    fn test_encoded_output_sniffs_as_target() {
        let img = gradient(32, 24);
        let cases = [
            (OutputFormat::Jpeg, ImageFormat::Jpeg),
            (OutputFormat::Png, ImageFormat::Png),
            (OutputFormat::WebP, ImageFormat::WebP),
            (OutputFormat::Tiff, ImageFormat::Tiff),
            (OutputFormat::Bmp, ImageFormat::Jpeg),
        ];
        for (target, expected) in cases {
            let data = encode(&img, target, 75).unwrap();
            assert_eq!(
                image::guess_format(&data).unwrap(),
                expected,
                "target {:?}",
                target
            );
        }
    }

    #[test]
    fn test_avif_output_has_ftyp_brand() {
        let data = encode(&gradient(16, 16), OutputFormat::Avif, 60).unwrap();
        assert_eq!(&data[4..12], b"ftypavif");
    }

    #[test]
    fn test_decode_round_trip_keeps_source_format() {
        let img = gradient(10, 6);
        let png = encode(&img, OutputFormat::Png, 90).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.source_format, ImageFormat::Png);
        assert_eq!(decoded.dimensions(), (10, 6));
        assert_eq!(decoded.compress_target(), OutputFormat::Png);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(ProcessingError::Decode(_))
        ));
        assert!(matches!(decode(&[]), Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_source_format_targets() {
        let tiff = DecodedImage {
            image: gradient(2, 2),
            source_format: ImageFormat::Tiff,
        };
        assert_eq!(tiff.compress_target(), OutputFormat::Jpeg);
        assert_eq!(tiff.preserved_target(), OutputFormat::Tiff);

        let gif = DecodedImage {
            image: gradient(2, 2),
            source_format: ImageFormat::Gif,
        };
        assert_eq!(gif.compress_target(), OutputFormat::Jpeg);
        assert_eq!(gif.preserved_target(), OutputFormat::Jpeg);
    }
}
