//! Public endpoints, authentication and rate limiting.
//!
//! Run with: `cargo test -p pixelmill-api --test service_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{default_server, image_form, png_bytes, test_server, TEST_DEV_API_KEY};
use pixelmill_core::Config;
use serde_json::Value;

#[tokio::test]
async fn test_health() {
    let server = default_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_service_info_lists_endpoints() {
    let server = default_server();

    let response = server.get("/").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Image Processing API");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["endpoints"].as_object().unwrap().len(), 6);
    assert!(body["endpoints"].get("POST /api/enhance").is_some());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let server = default_server();

    let response = server.get("/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "The requested resource was not found.");
}

#[tokio::test]
async fn test_security_headers_present() {
    let server = default_server();

    let response = server.get("/health").await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_production_requires_gateway_headers() {
    let server = test_server(Config::default().with_environment("production"));

    let response = server
        .post("/api/compress")
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Missing RapidAPI authentication headers");

    let response = server
        .post("/api/compress")
        .add_header("X-RapidAPI-Key", "key")
        .add_header("X-RapidAPI-Host", "pixelmill.example")
        .add_header("X-RapidAPI-User", "tester")
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;

    response.assert_status_ok();
    assert!(response.headers().get("strict-transport-security").is_some());
}

#[tokio::test]
async fn test_public_routes_skip_auth_in_production() {
    let server = test_server(Config::default().with_environment("production"));
    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_dev_api_key_enforced_when_required() {
    let server = test_server(Config::default().with_dev_api_key(TEST_DEV_API_KEY));

    let response = server
        .post("/api/compress")
        .add_header("X-API-Key", "wrong")
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid or missing API key");

    let response = server
        .post("/api/compress")
        .add_header("X-API-Key", TEST_DEV_API_KEY)
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_blocks_after_allowance() {
    let server = test_server(Config::default().with_rate_limit(2, 60));

    for remaining in ["1", "0"] {
        let response = server
            .post("/api/compress")
            .multipart(image_form(png_bytes(4, 4), &[]))
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-ratelimit-limit"), "2");
        assert_eq!(response.header("x-ratelimit-remaining"), remaining);
    }

    let response = server
        .post("/api/compress")
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        "Too many requests from this IP, please try again later."
    );

    // Public routes are not rate limited
    server.get("/health").await.assert_status_ok();
}
