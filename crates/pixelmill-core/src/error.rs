//! Error types module
//!
//! All errors surfaced by the service are unified under the `AppError` enum.
//! Engine errors are mapped into it at the API boundary so that no
//! codec-specific error shape ever reaches a client.

use std::io;

use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like rate limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the client may retry the same request later
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client (e.g., "Wait and retry")
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden outside development mode
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {} field(s) failed", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No image provided: {0}")]
    MissingImage(String),

    #[error("No watermark content provided: {0}")]
    MissingContent(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Processing timed out after {0}s")]
    Timeout(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(vec![FieldError::new("body", err.to_string())])
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let mut details = Vec::new();
        flatten_validation_errors("", &err, &mut details);
        details.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(details)
    }
}

/// Walk nested validator output into dotted field paths (e.g. `crop.width`).
fn flatten_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("\"{}\" failed {} check", path, e.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_validation_errors(&format!("{}.", path), nested, out);
            }
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    flatten_validation_errors(&format!("{}.{}.", path, idx), nested, out);
                }
            }
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::Validation(_) => (400, "VALIDATION_ERROR", false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, LogLevel::Debug),
        AppError::MissingImage(_) => (400, "NO_IMAGE_PROVIDED", false, LogLevel::Debug),
        AppError::MissingContent(_) => (400, "NO_WATERMARK_CONTENT", false, LogLevel::Debug),
        AppError::UnsupportedFormat(_) => (400, "UNSUPPORTED_FORMAT", false, LogLevel::Debug),
        AppError::OutOfBounds(_) => (400, "OUT_OF_BOUNDS", false, LogLevel::Debug),
        AppError::PayloadTooLarge { .. } => (400, "FILE_TOO_LARGE", false, LogLevel::Debug),
        AppError::ImageDecode(_) => (500, "IMAGE_DECODE_ERROR", true, LogLevel::Warn),
        AppError::ImageProcessing(_) => (500, "IMAGE_PROCESSING_ERROR", true, LogLevel::Error),
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, LogLevel::Debug),
        AppError::RateLimited { .. } => (429, "RATE_LIMITED", false, LogLevel::Warn),
        AppError::Timeout(_) => (503, "PROCESSING_TIMEOUT", false, LogLevel::Warn),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited { .. } | AppError::Timeout(_)
        )
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => {
                Some("Check the request fields and try again")
            }
            AppError::MissingImage(_) => Some("Attach the file as the 'image' multipart field"),
            AppError::PayloadTooLarge { .. } => Some("Upload a smaller image"),
            AppError::Unauthorized(_) => Some("Provide valid API credentials"),
            AppError::RateLimited { .. } => Some("Wait for the rate limit window to reset"),
            AppError::Timeout(_) => Some("Retry with a smaller image"),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation Error".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::MissingImage(_) => "No image provided".to_string(),
            AppError::MissingContent(_) => "No watermark content provided".to_string(),
            AppError::UnsupportedFormat(msg) => format!("Unsupported format: {}", msg),
            AppError::OutOfBounds(msg) => msg.clone(),
            AppError::PayloadTooLarge { max, .. } => format!(
                "File too large. Maximum size is {}MB.",
                max / (1024 * 1024)
            ),
            AppError::ImageDecode(_) | AppError::ImageProcessing(_) => {
                "Failed to process image".to_string()
            }
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::RateLimited { .. } => {
                "Too many requests from this IP, please try again later.".to_string()
            }
            AppError::Timeout(_) => "Image processing took too long".to_string(),
            AppError::NotFound(_) => "The requested resource was not found.".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal Server Error".to_string()
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }
}

impl AppError {
    /// Field-level details, populated only for validation failures
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::Validation(details) => details,
            _ => &[],
        }
    }

    /// Full internal message, safe to expose only in development mode
    pub fn detailed_message(&self) -> String {
        match self {
            AppError::InternalWithSource { message, source } => {
                format!("{}: {:?}", message, source)
            }
            other => other.to_string(),
        }
    }

    /// Short variant name used in structured logs
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::MissingImage(_) => "MissingImage",
            AppError::MissingContent(_) => "MissingContent",
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::OutOfBounds(_) => "OutOfBounds",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::ImageDecode(_) => "ImageDecode",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::RateLimited { .. } => "RateLimited",
            AppError::Timeout(_) => "Timeout",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "InternalWithSource",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Inner {
        #[validate(range(min = 1, message = "width must be at least 1"))]
        width: u32,
    }

    #[derive(Debug, Validate)]
    struct Outer {
        #[validate(range(min = 1, max = 100))]
        quality: u32,
        #[validate(nested)]
        crop: Inner,
    }

    #[test]
    fn test_validation_errors_flatten_to_dotted_paths() {
        let value = Outer {
            quality: 0,
            crop: Inner { width: 0 },
        };
        let err: AppError = value.validate().unwrap_err().into();

        let details = err.field_errors();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].field, "crop.width");
        assert_eq!(details[0].message, "width must be at least 1");
        assert_eq!(details[1].field, "quality");
        assert!(details[1].message.contains("range"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation(vec![]).http_status_code(), 400);
        assert_eq!(
            AppError::MissingContent("no text".into()).http_status_code(),
            400
        );
        assert_eq!(AppError::ImageDecode("bad".into()).http_status_code(), 500);
        assert_eq!(AppError::Unauthorized("x".into()).http_status_code(), 401);
        assert_eq!(
            AppError::RateLimited {
                retry_after_secs: 5
            }
            .http_status_code(),
            429
        );
        assert_eq!(AppError::Timeout(60).http_status_code(), 503);
        assert!(AppError::Timeout(60).is_recoverable());
        assert!(!AppError::OutOfBounds("crop".into()).is_recoverable());
    }

    #[test]
    fn test_payload_too_large_message_matches_limit() {
        let err = AppError::PayloadTooLarge {
            size: 11 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        };
        assert_eq!(err.client_message(), "File too large. Maximum size is 10MB.");
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_internal_errors_are_sensitive() {
        let err: AppError = anyhow::anyhow!("encoder exploded").into();
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal Server Error");
        assert!(err.detailed_message().contains("encoder exploded"));
        assert_eq!(err.log_level(), LogLevel::Error);
    }
}
