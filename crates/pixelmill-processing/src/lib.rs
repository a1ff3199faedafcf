//! Pixelmill Image Transform Engine
//!
//! Stateless image operations: every entry point in [`pipeline`] takes raw
//! encoded bytes plus an option value and returns freshly encoded bytes.

pub mod codec;
pub mod error;
pub mod image;
pub mod options;
pub mod pipeline;
pub mod validator;

// Re-export commonly used types
pub use codec::{DecodedImage, FormatSpec, OutputFormat};
pub use error::ProcessingError;
pub use self::image::{
    BackgroundRemover, ImageOrientation, ImageResize, LanczosUpscaler, TextWatermark,
    ThresholdMatte, Upscaler,
};
pub use options::{
    CompressOptions, ConvertOptions, CropRegion, EnhanceOptions, FitMode, HexColor, MatteFormat,
    RemoveBackgroundOptions, Rotation, TransformOptions, WatermarkOptions, WatermarkPosition,
};
pub use pipeline::{ImageEngine, ProcessedImage};
pub use validator::{UploadValidator, ValidationError};
