//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` (engine errors, upload validation, `validator`
//! output) converts into `HttpAppError` and renders with the same body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixelmill_core::{AppError, ErrorMetadata, FieldError, LogLevel};
use pixelmill_processing::{ProcessingError, ValidationError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
    /// Field-level failures, only for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    /// Internal message, only outside production and never for sensitive errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(error: &AppError, expose_detail: bool) -> Self {
        let details = match error.field_errors() {
            [] => None,
            fields => Some(fields.to_vec()),
        };
        let detail = (expose_detail && !error.is_sensitive()).then(|| error.detailed_message());

        Self {
            error: error.client_message(),
            code: error.error_code().to_string(),
            status: error.http_status_code(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details,
            detail,
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rules: both the trait and AppError are foreign to this crate)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<ProcessingError> for HttpAppError {
    fn from(err: ProcessingError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

pub(crate) fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("NODE_ENV"))
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, !is_production_env());
        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited { retry_after_secs } = app_error {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_body_carries_details() {
        let err = AppError::Validation(vec![FieldError::new(
            "quality",
            "\"quality\" must be between 1 and 100",
        )]);
        let body = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();

        assert_eq!(body["error"], "Validation Error");
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["status"], 400);
        assert_eq!(body["details"][0]["field"], "quality");
        assert!(body.get("timestamp").is_some());
    }

    #[test]
    fn test_details_omitted_for_other_errors() {
        let err = AppError::MissingImage("no file part".into());
        let body = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();

        assert_eq!(body["error"], "No image provided");
        assert!(body.get("details").is_none());
        assert!(body["detail"].as_str().unwrap().contains("no file part"));
    }

    #[test]
    fn test_sensitive_detail_never_exposed() {
        let err = AppError::ImageDecode("corrupt huffman table".into());
        let body = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();

        assert_eq!(body["error"], "Failed to process image");
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn test_detail_hidden_in_production() {
        let err = AppError::OutOfBounds("crop exceeds image".into());
        let body = serde_json::to_value(ErrorResponse::from_app_error(&err, false)).unwrap();
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = HttpAppError(AppError::RateLimited {
            retry_after_secs: 42,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "42");
    }
}
