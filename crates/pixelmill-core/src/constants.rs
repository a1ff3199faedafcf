//! Service-wide constants.

/// Default upload ceiling (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Extensions accepted by the upload handler
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "bmp", "tiff", "svg"];

/// MIME types accepted by the upload handler
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/svg+xml",
];

/// Name of the multipart field carrying the primary image
pub const IMAGE_FIELD: &str = "image";

/// Name of the optional secondary multipart field on the watermark route
pub const WATERMARK_FIELD: &str = "watermark";

/// Response header reporting the applied upscale factor
pub const ENHANCEMENT_SCALE_HEADER: &str = "x-enhancement-scale";
