//! The six image operations.
//!
//! Each operation is `(bytes, options) -> ProcessedImage`: decode, apply
//! primitives in a fixed order, encode. Nothing is shared between calls.

use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;

use crate::codec::{self, OutputFormat, DEFAULT_REENCODE_QUALITY};
use crate::error::ProcessingError;
use crate::image::{
    composite_over, BackgroundRemover, ImageOrientation, ImageResize, LanczosUpscaler,
    TextWatermark, ThresholdMatte, Upscaler,
};
use crate::options::{
    CompressOptions, ConvertOptions, EnhanceOptions, MatteFormat, RemoveBackgroundOptions,
    TransformOptions, WatermarkOptions,
};

/// Quality of the second WebP pass in `remove_background`
const MATTE_WEBP_QUALITY: u8 = 80;

/// Encoded result of an operation
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Bytes,
    /// Format the bytes are actually in (fallbacks already applied)
    pub format: OutputFormat,
}

impl ProcessedImage {
    fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Self, ProcessingError> {
        let data = codec::encode(img, format, quality)?;
        Ok(Self {
            data,
            format: format.resolved(),
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Prefix internal failures with the operation; decode and input errors pass through.
fn failed(operation: &'static str) -> impl Fn(ProcessingError) -> ProcessingError {
    move |err| match err {
        ProcessingError::Internal(msg) => {
            ProcessingError::Internal(format!("Failed to {}: {}", operation, msg))
        }
        other => other,
    }
}

/// Re-encode at `quality`, in `options.format` or a format derived from the source.
#[tracing::instrument(skip(data), fields(input_size = data.len()))]
pub fn compress(data: &[u8], options: &CompressOptions) -> Result<ProcessedImage, ProcessingError> {
    let decoded = codec::decode(data)?;
    let target = options.format.unwrap_or_else(|| decoded.compress_target());

    let out = ProcessedImage::encode(&decoded.image, target, options.quality)
        .map_err(failed("compress image"))?;

    tracing::info!(
        format = %out.format,
        input_size = data.len(),
        output_size = out.len(),
        "Image compressed"
    );
    Ok(out)
}

#[tracing::instrument(skip(data), fields(input_size = data.len()))]
pub fn convert(data: &[u8], options: &ConvertOptions) -> Result<ProcessedImage, ProcessingError> {
    let decoded = codec::decode(data)?;

    let out = ProcessedImage::encode(&decoded.image, options.format, options.quality)
        .map_err(failed("convert image"))?;

    tracing::info!(
        from = ?decoded.source_format,
        to = %out.format,
        output_size = out.len(),
        "Image converted"
    );
    Ok(out)
}

/// Resize, rotate, flip, flop, crop, in that order.
#[tracing::instrument(skip(data), fields(input_size = data.len()))]
pub fn transform(
    data: &[u8],
    options: &TransformOptions,
) -> Result<ProcessedImage, ProcessingError> {
    let decoded = codec::decode(data)?;
    let target = decoded.preserved_target();
    let mut img = decoded.image;

    if options.width.is_some() || options.height.is_some() {
        img = ImageResize::apply(img, options.width, options.height, options.fit)
            .map_err(failed("transform image"))?;
    }
    if let Some(rotation) = options.rotate {
        img = ImageOrientation::rotate(img, rotation);
    }
    if options.flip {
        img = ImageOrientation::flip(img);
    }
    if options.flop {
        img = ImageOrientation::flop(img);
    }
    if let Some(region) = options.crop {
        img = ImageOrientation::crop(img, region)?;
    }

    ProcessedImage::encode(&img, target, DEFAULT_REENCODE_QUALITY)
        .map_err(failed("transform image"))
}

/// Draw text onto the image. Output is always PNG.
#[tracing::instrument(
    skip(data, options),
    fields(input_size = data.len(), position = ?options.position)
)]
pub fn watermark(
    data: &[u8],
    options: &WatermarkOptions,
) -> Result<ProcessedImage, ProcessingError> {
    if options.text.as_deref().map_or(true, str::is_empty) {
        return Err(ProcessingError::MissingContent(
            "No watermark content provided".to_string(),
        ));
    }

    let decoded = codec::decode(data)?;
    let stamped = TextWatermark::apply(&decoded.image, options)?;

    ProcessedImage::encode(
        &DynamicImage::ImageRgba8(stamped),
        OutputFormat::Png,
        DEFAULT_REENCODE_QUALITY,
    )
    .map_err(failed("add watermark"))
}

/// Holds the pluggable capabilities used by `remove_background` and `enhance`.
#[derive(Clone)]
pub struct ImageEngine {
    remover: Arc<dyn BackgroundRemover>,
    upscaler: Arc<dyn Upscaler>,
}

impl Default for ImageEngine {
    fn default() -> Self {
        Self {
            remover: Arc::new(ThresholdMatte::default()),
            upscaler: Arc::new(LanczosUpscaler::default()),
        }
    }
}

impl std::fmt::Debug for ImageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEngine")
            .field("remover", &self.remover.name())
            .field("upscaler", &self.upscaler.name())
            .finish()
    }
}

impl ImageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background_remover(mut self, remover: Arc<dyn BackgroundRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn with_upscaler(mut self, upscaler: Arc<dyn Upscaler>) -> Self {
        self.upscaler = upscaler;
        self
    }

    pub fn compress(
        &self,
        data: &[u8],
        options: &CompressOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        compress(data, options)
    }

    pub fn convert(
        &self,
        data: &[u8],
        options: &ConvertOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        convert(data, options)
    }

    pub fn transform(
        &self,
        data: &[u8],
        options: &TransformOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        transform(data, options)
    }

    pub fn watermark(
        &self,
        data: &[u8],
        options: &WatermarkOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        watermark(data, options)
    }

    #[tracing::instrument(
        skip(self, data),
        fields(input_size = data.len(), remover = self.remover.name())
    )]
    pub fn remove_background(
        &self,
        data: &[u8],
        options: &RemoveBackgroundOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        let decoded = codec::decode(data)?;
        let mut matte = self.remover.remove(&decoded.image)?;

        if let Some(color) = options.background_color {
            matte = composite_over(&matte, color);
        }

        let png = ProcessedImage::encode(
            &DynamicImage::ImageRgba8(matte),
            OutputFormat::Png,
            DEFAULT_REENCODE_QUALITY,
        )
        .map_err(failed("remove background"))?;

        match options.output_format {
            MatteFormat::Png => Ok(png),
            MatteFormat::Webp => {
                // Second pass from the PNG bytes
                let reread = codec::decode(&png.data).map_err(|e| {
                    ProcessingError::Internal(format!("Failed to remove background: {}", e))
                })?;
                ProcessedImage::encode(&reread.image, OutputFormat::WebP, MATTE_WEBP_QUALITY)
                    .map_err(failed("remove background"))
            }
        }
    }

    #[tracing::instrument(
        skip(self, data),
        fields(input_size = data.len(), upscaler = self.upscaler.name())
    )]
    pub fn enhance(
        &self,
        data: &[u8],
        options: &EnhanceOptions,
    ) -> Result<ProcessedImage, ProcessingError> {
        let decoded = codec::decode(data)?;
        let target = decoded.preserved_target();

        let upscaled = self.upscaler.upscale(&decoded.image, options)?;

        ProcessedImage::encode(&upscaled, target, DEFAULT_REENCODE_QUALITY)
            .map_err(failed("enhance image"))
    }
}

/// `remove_background` with the default threshold matte
pub fn remove_background(
    data: &[u8],
    options: &RemoveBackgroundOptions,
) -> Result<ProcessedImage, ProcessingError> {
    ImageEngine::default().remove_background(data, options)
}

/// `enhance` with the default Lanczos upscaler
pub fn enhance(data: &[u8], options: &EnhanceOptions) -> Result<ProcessedImage, ProcessingError> {
    ImageEngine::default().enhance(data, options)
}
