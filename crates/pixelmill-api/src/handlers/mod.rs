//! Route handlers for the image operations

pub mod images;

use std::time::Instant;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use pixelmill_core::AppError;
use pixelmill_processing::{ImageEngine, ProcessedImage, ProcessingError};

use crate::state::AppState;

/// Run one engine call on the blocking pool under the processing deadline.
///
/// A deadline breach fails only this request; the blocking task is left to
/// finish and its result dropped.
pub(crate) async fn run_engine<F>(
    state: &AppState,
    operation: &'static str,
    job: F,
) -> Result<ProcessedImage, AppError>
where
    F: FnOnce(&ImageEngine) -> Result<ProcessedImage, ProcessingError> + Send + 'static,
{
    let engine = state.engine.clone();
    let deadline = state.processing_timeout();
    let started = Instant::now();

    let task = tokio::task::spawn_blocking(move || job(&engine));

    let joined = tokio::time::timeout(deadline, task).await.map_err(|_| {
        tracing::warn!(
            operation = operation,
            timeout_secs = deadline.as_secs(),
            "Image processing exceeded deadline"
        );
        AppError::Timeout(deadline.as_secs())
    })?;

    let processed = joined
        .map_err(|e| {
            tracing::error!(error = %e, operation = operation, "Image task failed to complete");
            AppError::Internal(format!("Image task failed: {}", e))
        })?
        .map_err(AppError::from)?;

    tracing::info!(
        operation = operation,
        format = %processed.format,
        output_size = processed.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Image processed"
    );

    Ok(processed)
}

/// Raw image response with type and length taken from the encoded output
pub(crate) fn image_response(
    processed: ProcessedImage,
    extra: Option<(HeaderName, HeaderValue)>,
) -> Result<Response, AppError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, processed.mime_type())
        .header(header::CONTENT_LENGTH, processed.len());

    if let Some((name, value)) = extra {
        builder = builder.header(name, value);
    }

    builder.body(Body::from(processed.data)).map_err(|e| {
        tracing::error!(error = %e, "Failed to build response");
        AppError::Internal(e.to_string())
    })
}
