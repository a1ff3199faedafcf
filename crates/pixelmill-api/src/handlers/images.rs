//! The six `/api` image operations.
//!
//! Each handler reads the multipart body, parses its options before looking
//! for the image, runs the engine off the async runtime and returns the
//! encoded bytes.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{HeaderName, HeaderValue},
    response::Response,
};
use pixelmill_core::constants::ENHANCEMENT_SCALE_HEADER;
use pixelmill_core::AppError;

use super::{image_response, run_engine};
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::upload::extract_image_upload;
use crate::validation::{
    CompressRequest, ConvertRequest, EnhanceRequest, OptionsRequest, RemoveBackgroundRequest,
    TransformRequest, WatermarkRequest,
};

#[tracing::instrument(skip(state, multipart), fields(operation = "remove_background"))]
pub async fn remove_background(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, false).await?;
    let options = RemoveBackgroundRequest::from_fields(&upload.fields)?.into_options()?;
    let image = upload.require_image()?;

    let processed = run_engine(&state, "remove_background", move |engine| {
        engine.remove_background(&image.data, &options)
    })
    .await?;

    Ok(image_response(processed, None)?)
}

#[tracing::instrument(skip(state, multipart), fields(operation = "compress"))]
pub async fn compress(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, false).await?;
    let options = CompressRequest::from_fields(&upload.fields)?.into_options()?;
    let image = upload.require_image()?;

    let processed = run_engine(&state, "compress", move |engine| {
        engine.compress(&image.data, &options)
    })
    .await?;

    Ok(image_response(processed, None)?)
}

#[tracing::instrument(skip(state, multipart), fields(operation = "convert"))]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, false).await?;
    let options = ConvertRequest::from_fields(&upload.fields)?.into_options()?;
    let image = upload.require_image()?;

    let processed = run_engine(&state, "convert", move |engine| {
        engine.convert(&image.data, &options)
    })
    .await?;

    Ok(image_response(processed, None)?)
}

#[tracing::instrument(skip(state, multipart), fields(operation = "transform"))]
pub async fn transform(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, false).await?;
    let options = TransformRequest::from_fields(&upload.fields)?.into_options()?;
    let image = upload.require_image()?;

    let processed = run_engine(&state, "transform", move |engine| {
        engine.transform(&image.data, &options)
    })
    .await?;

    Ok(image_response(processed, None)?)
}

#[tracing::instrument(skip(state, multipart), fields(operation = "watermark"))]
pub async fn watermark(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, true).await?;
    let options = WatermarkRequest::from_fields(&upload.fields)?.into_options()?;
    let image = upload.require_image()?;

    let has_text = options.text.as_deref().is_some_and(|t| !t.is_empty());
    if !has_text && upload.watermark.is_none() {
        return Err(AppError::MissingContent(
            "Please provide either text or a watermark image".to_string(),
        )
        .into());
    }
    if upload.watermark.is_some() {
        // Only text watermarks are drawn; the extra file is accepted and ignored
        tracing::warn!(has_text = has_text, "Ignoring uploaded watermark image");
    }

    let processed = run_engine(&state, "watermark", move |engine| {
        engine.watermark(&image.data, &options)
    })
    .await?;

    Ok(image_response(processed, None)?)
}

#[tracing::instrument(skip(state, multipart), fields(operation = "enhance"))]
pub async fn enhance(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut upload = extract_image_upload(multipart, &state.upload_validator, false).await?;
    let request = EnhanceRequest::from_fields(&upload.fields)?;
    let image = upload.require_image()?;
    let scale_header = HeaderValue::from_str(&request.scale.to_string())
        .map_err(|e| AppError::Internal(format!("Invalid scale header: {}", e)))?;
    let options = request.into_options();

    let processed = run_engine(&state, "enhance", move |engine| {
        engine.enhance(&image.data, &options)
    })
    .await?;

    Ok(image_response(
        processed,
        Some((HeaderName::from_static(ENHANCEMENT_SCALE_HEADER), scale_header)),
    )?)
}
