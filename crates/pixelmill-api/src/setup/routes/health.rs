//! Public service endpoints: health and info.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::constants::{API_PREFIX, SERVICE_NAME, SERVICE_VERSION};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the service started
    pub uptime: f64,
}

/// Liveness probe
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: state.uptime().as_secs_f64(),
        }),
    )
}

const ENDPOINTS: &[(&str, &str)] = &[
    ("remove-background", "Remove image background"),
    ("compress", "Compress images with quality settings"),
    ("convert", "Convert between formats (JPEG, PNG, WebP, AVIF, TIFF, BMP)"),
    ("transform", "Resize, crop, rotate and flip operations"),
    ("watermark", "Add text watermarks"),
    ("enhance", "Upscaling and enhancement"),
];

/// Service name, version and the operations it exposes
pub(super) async fn service_info() -> impl IntoResponse {
    let endpoints: Map<String, Value> = ENDPOINTS
        .iter()
        .map(|(path, description)| {
            (
                format!("POST {}/{}", API_PREFIX, path),
                Value::from(*description),
            )
        })
        .collect();

    Json(json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "endpoints": endpoints,
    }))
}
