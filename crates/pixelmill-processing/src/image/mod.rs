//! Pixel-level primitives the pipelines are composed from:
//! - Resizing with fit policies (resize)
//! - Rotation, mirroring and cropping (orientation)
//! - Bitmap text watermarking (watermark)
//! - Background matting and upscaling behind capability traits (background, enhance)

pub mod background;
pub mod enhance;
pub mod orientation;
pub mod resize;
pub mod watermark;

pub use background::{composite_over, BackgroundRemover, ThresholdMatte};
pub use enhance::{LanczosUpscaler, Upscaler};
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
pub use watermark::{TextMetrics, TextWatermark};
