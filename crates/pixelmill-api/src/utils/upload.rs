//! Multipart extraction for the image routes

use std::collections::BTreeMap;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use pixelmill_core::constants::{IMAGE_FIELD, WATERMARK_FIELD};
use pixelmill_core::AppError;
use pixelmill_processing::UploadValidator;

/// One validated file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Everything a multipart request carried: the files we accept plus all
/// text fields as raw strings (coerced later by `validation`).
#[derive(Debug, Default)]
pub struct ImageUpload {
    pub image: Option<UploadedFile>,
    pub watermark: Option<UploadedFile>,
    pub fields: BTreeMap<String, String>,
}

impl ImageUpload {
    /// The primary image, or the "No image provided" error
    pub fn require_image(&mut self) -> Result<UploadedFile, AppError> {
        self.image.take().ok_or_else(|| {
            AppError::MissingImage("request has no 'image' file part".to_string())
        })
    }
}

fn multipart_error(err: MultipartError, max: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            size: max.saturating_add(1),
            max,
        }
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Stream a file part, giving up as soon as it passes the size ceiling.
async fn read_file(mut field: Field<'_>, validator: &UploadValidator) -> Result<UploadedFile, AppError> {
    let max = validator.max_file_size();
    let filename = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max))? {
        buffer.extend_from_slice(&chunk);
        if buffer.len() > max {
            return Err(AppError::PayloadTooLarge {
                size: buffer.len(),
                max,
            });
        }
    }

    validator.validate(filename.as_deref(), content_type.as_deref(), buffer.len())?;

    Ok(UploadedFile {
        data: buffer.freeze(),
        filename,
        content_type,
    })
}

/// Read the whole multipart body.
///
/// Accepts at most one `image` part, plus one `watermark` part when
/// `accept_watermark` is set. Any other file part is rejected.
pub async fn extract_image_upload(
    mut multipart: Multipart,
    validator: &UploadValidator,
    accept_watermark: bool,
) -> Result<ImageUpload, AppError> {
    let max = validator.max_file_size();
    let mut upload = ImageUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();

        match name.as_str() {
            IMAGE_FIELD => {
                if upload.image.is_some() {
                    return Err(AppError::InvalidInput(
                        "Only one 'image' file may be uploaded".to_string(),
                    ));
                }
                upload.image = Some(read_file(field, validator).await?);
            }
            WATERMARK_FIELD if accept_watermark => {
                if upload.watermark.is_some() {
                    return Err(AppError::InvalidInput(
                        "Only one 'watermark' file may be uploaded".to_string(),
                    ));
                }
                upload.watermark = Some(read_file(field, validator).await?);
            }
            _ if is_file => {
                return Err(AppError::InvalidInput(format!(
                    "Unexpected file field '{}'",
                    name
                )));
            }
            _ => {
                let value = field.text().await.map_err(|e| multipart_error(e, max))?;
                upload.fields.insert(name, value);
            }
        }
    }

    tracing::debug!(
        has_image = upload.image.is_some(),
        has_watermark = upload.watermark.is_some(),
        text_fields = upload.fields.len(),
        "Multipart body extracted"
    );

    Ok(upload)
}
