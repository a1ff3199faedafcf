//! Route configuration and setup.
//!
//! Image operations live under `/api` behind rate limiting and auth; health
//! and info are public.

mod health;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Uri},
    routing::{get, post},
    Router,
};
use pixelmill_core::{AppError, Config};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthState};
use crate::constants::API_PREFIX;
use crate::error::HttpAppError;
use crate::handlers::images;
use crate::middleware::{
    rate_limit_middleware, security_headers_middleware, HttpRateLimiter, RateLimitState,
    SecurityHeadersConfig,
};
use crate::state::AppState;
use crate::telemetry::make_request_span;

/// Room for multipart boundaries and text fields on top of the file bytes
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::from_config(config));
    let rate_limit_state = Arc::new(RateLimitState {
        limiter: HttpRateLimiter::new(
            config.rate_limit_max_requests(),
            config.rate_limit_window_secs(),
        ),
        trusted_proxy_count: config.trusted_proxy_count(),
    });
    let security_headers_config = Arc::new(SecurityHeadersConfig::new(config.is_production()));

    tracing::info!(
        production = auth_state.is_production,
        require_api_key = auth_state.require_api_key,
        "Authentication configured"
    );

    // Rate limit wraps auth so rejected credentials still count
    let api_routes = image_routes()
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit_state,
            rate_limit_middleware,
        ));

    let http_concurrency_limit = config.http_concurrency_limit().max(1);
    // Watermark requests may carry two files
    let body_limit = config
        .max_file_size_bytes()
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        body_limit_bytes = body_limit,
        "HTTP limits configured"
    );

    let app = Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .nest(API_PREFIX, api_routes)
        .fallback(not_found)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn image_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/remove-background", post(images::remove_background))
        .route("/compress", post(images::compress))
        .route("/convert", post(images::convert))
        .route("/transform", post(images::transform))
        .route("/watermark", post(images::watermark))
        .route("/enhance", post(images::enhance))
}

async fn not_found(uri: Uri) -> HttpAppError {
    HttpAppError(AppError::NotFound(uri.path().to_string()))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let cors = if config.allowed_origins().is_empty()
        || config.allowed_origins().iter().any(|o| o == "*")
    {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .allowed_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid ALLOWED_ORIGINS entry: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
                axum::http::HeaderName::from_static("x-api-key"),
            ])
            .allow_credentials(true)
    };

    Ok(cors)
}
