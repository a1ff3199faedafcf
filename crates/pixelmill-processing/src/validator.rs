use std::path::Path;

use pixelmill_core::constants::{
    ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE_BYTES,
};
use pixelmill_core::AppError;

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { size, max } => AppError::PayloadTooLarge { size, max },
            ValidationError::InvalidExtension { extension, .. } => AppError::InvalidInput(
                format!("Invalid file type. Extension '{}' is not allowed.", extension),
            ),
            ValidationError::InvalidContentType { content_type, .. } => AppError::InvalidInput(
                format!("Invalid file type. '{}' is not an allowed image type.", content_type),
            ),
            ValidationError::EmptyFile => {
                AppError::MissingImage("uploaded file is empty".to_string())
            }
        }
    }
}

/// Checks an uploaded image against size, extension and MIME allow-lists.
///
/// The decoder never trusts these; they only reject obviously wrong uploads
/// before any pixel work happens.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE_BYTES)
    }
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            max_file_size,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            allowed_content_types: ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Files without an extension pass; the MIME check still applies.
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let Some(extension) = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
        else {
            return Ok(());
        };

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Run every check for one uploaded part
    pub fn validate(
        &self,
        filename: Option<&str>,
        content_type: Option<&str>,
        size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(size)?;
        if let Some(filename) = filename {
            self.validate_extension(filename)?;
        }
        if let Some(content_type) = content_type {
            self.validate_content_type(content_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelmill_core::ErrorMetadata;

    #[test]
    fn test_file_size_limits() {
        let validator = UploadValidator::new(1024);
        assert!(validator.validate_file_size(512).is_ok());
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            validator.validate_file_size(2048),
            Err(ValidationError::FileTooLarge {
                size: 2048,
                max: 1024
            })
        ));
    }

    #[test]
    fn test_extension_allow_list() {
        let validator = UploadValidator::default();
        assert!(validator.validate_extension("photo.JPG").is_ok());
        assert!(validator.validate_extension("scan.tiff").is_ok());
        assert!(validator.validate_extension("blob").is_ok());
        assert!(matches!(
            validator.validate_extension("script.exe"),
            Err(ValidationError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_content_type_allow_list() {
        let validator = UploadValidator::default();
        assert!(validator.validate_content_type("image/png").is_ok());
        assert!(validator.validate_content_type("IMAGE/JPEG").is_ok());
        assert!(validator.validate_content_type("image/svg+xml").is_ok());
        assert!(validator
            .validate_content_type("application/pdf")
            .is_err());
    }

    #[test]
    fn test_too_large_maps_to_payload_error() {
        let validator = UploadValidator::default();
        let err = validator
            .validate(Some("big.png"), Some("image/png"), 11 * 1024 * 1024)
            .unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.http_status_code(), 400);
        assert_eq!(app.client_message(), "File too large. Maximum size is 10MB.");
    }
}
