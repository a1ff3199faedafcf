use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pixelmill_core::{AppError, Config};
use subtle::ConstantTimeEq;

use crate::constants::{
    DEV_API_KEY_HEADER, RAPIDAPI_HOST_HEADER, RAPIDAPI_KEY_HEADER, RAPIDAPI_USER_HEADER,
};
use crate::error::HttpAppError;

/// How requests are authenticated.
///
/// Production sits behind the RapidAPI gateway, which authenticates callers
/// and forwards `X-RapidAPI-*` headers. Outside production an optional shared
/// development key can be enforced.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub is_production: bool,
    pub require_api_key: bool,
    pub dev_api_key: Option<String>,
}

impl AuthState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            is_production: config.is_production(),
            require_api_key: config.require_api_key(),
            dev_api_key: config.dev_api_key().map(str::to_string),
        }
    }
}

/// Gateway user forwarded in `X-RapidAPI-User`, inserted into request extensions
#[derive(Debug, Clone)]
pub struct RapidApiUser(pub Option<String>);

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();

    if auth_state.is_production {
        let key = header(headers, RAPIDAPI_KEY_HEADER);
        let host = header(headers, RAPIDAPI_HOST_HEADER);

        if key.is_none() || host.is_none() {
            tracing::warn!(
                path = %request.uri().path(),
                has_key = key.is_some(),
                has_host = host.is_some(),
                "Rejected request without gateway headers"
            );
            return HttpAppError(AppError::Unauthorized(
                "Missing RapidAPI authentication headers".to_string(),
            ))
            .into_response();
        }

        let user = header(headers, RAPIDAPI_USER_HEADER).map(str::to_string);
        tracing::info!(
            user = user.as_deref().unwrap_or("anonymous"),
            endpoint = %request.uri().path(),
            method = %request.method(),
            "Authenticated gateway request"
        );
        request.extensions_mut().insert(RapidApiUser(user));
        return next.run(request).await;
    }

    if auth_state.require_api_key {
        let provided = header(headers, DEV_API_KEY_HEADER);
        let valid = match (provided, auth_state.dev_api_key.as_deref()) {
            (Some(provided), Some(expected)) => secure_compare(provided, expected),
            _ => false,
        };

        if !valid {
            tracing::debug!(path = %request.uri().path(), "Rejected request with bad API key");
            return HttpAppError(AppError::Unauthorized(
                "Invalid or missing API key".to_string(),
            ))
            .into_response();
        }
    }

    next.run(request).await
}
