use pixelmill_core::AppError;

/// Errors produced by the transform engine.
///
/// Primitive failures from the codec crates are always folded into one of
/// these variants with a readable message.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    OutOfBounds(String),

    #[error("{0}")]
    MissingContent(String),

    /// An option value the engine cannot act on
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("{0}")]
    Internal(String),
}

impl ProcessingError {
    pub(crate) fn internal(operation: &str, err: impl std::fmt::Display) -> Self {
        ProcessingError::Internal(format!("Failed to {}: {}", operation, err))
    }
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Decode(msg) => AppError::ImageDecode(msg),
            ProcessingError::UnsupportedFormat(msg) => AppError::UnsupportedFormat(msg),
            ProcessingError::OutOfBounds(msg) => AppError::OutOfBounds(msg),
            ProcessingError::MissingContent(msg) => AppError::MissingContent(msg),
            ProcessingError::InvalidOption(msg) => AppError::InvalidInput(msg),
            ProcessingError::Internal(msg) => AppError::ImageProcessing(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelmill_core::ErrorMetadata;

    #[test]
    fn test_internal_prefixes_operation() {
        let err = ProcessingError::internal("compress image", "encoder gave up");
        assert_eq!(err.to_string(), "Failed to compress image: encoder gave up");
    }

    #[test]
    fn test_maps_to_app_error_status() {
        let cases = [
            (ProcessingError::Decode("x".into()), 500),
            (ProcessingError::UnsupportedFormat("gifx".into()), 400),
            (ProcessingError::OutOfBounds("crop".into()), 400),
            (ProcessingError::MissingContent("text".into()), 400),
            (ProcessingError::InvalidOption("rotate".into()), 400),
            (ProcessingError::Internal("boom".into()), 500),
        ];
        for (err, status) in cases {
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), status);
        }
    }
}
