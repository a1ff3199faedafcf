//! Image route integration tests.
//!
//! Run with: `cargo test -p pixelmill-api --test images_test`

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::{decode, default_server, fields_form, image_form, png_bytes, png_part};
use image::{GenericImageView, ImageFormat};
use serde_json::Value;

#[tokio::test]
async fn test_missing_image_is_rejected() {
    let server = default_server();

    let response = server
        .post("/api/compress")
        .multipart(fields_form(&[("quality", "70")]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No image provided");
    assert_eq!(body["code"], "NO_IMAGE_PROVIDED");
}

#[tokio::test]
async fn test_invalid_quality_reports_field_details() {
    let server = default_server();

    let response = server
        .post("/api/compress")
        .multipart(image_form(png_bytes(8, 8), &[("quality", "150")]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation Error");
    assert_eq!(body["details"][0]["field"], "quality");
    assert_eq!(
        body["details"][0]["message"],
        "\"quality\" must be between 1 and 100"
    );
}

#[tokio::test]
async fn test_validation_runs_before_image_check() {
    let server = default_server();

    let response = server
        .post("/api/convert")
        .multipart(fields_form(&[("format", "gif")]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation Error");
    assert_eq!(body["details"][0]["field"], "format");
}

#[tokio::test]
async fn test_convert_jpg_alias_returns_jpeg() {
    let server = default_server();

    let response = server
        .post("/api/convert")
        .multipart(image_form(png_bytes(16, 12), &[("format", "jpg")]))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");

    let data = response.as_bytes();
    assert_eq!(
        response.header("content-length").to_str().unwrap(),
        data.len().to_string()
    );
    assert_eq!(image::guess_format(data).unwrap(), ImageFormat::Jpeg);
    assert_eq!(decode(data).dimensions(), (16, 12));
}

#[tokio::test]
async fn test_convert_requires_format() {
    let server = default_server();

    let response = server
        .post("/api/convert")
        .multipart(image_form(png_bytes(4, 4), &[]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["message"], "\"format\" is required");
}

#[tokio::test]
async fn test_compress_keeps_png() {
    let server = default_server();

    let response = server
        .post("/api/compress")
        .multipart(image_form(png_bytes(10, 10), &[("quality", "50")]))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
}

#[tokio::test]
async fn test_transform_resize_and_rotate() {
    let server = default_server();

    let response = server
        .post("/api/transform")
        .multipart(image_form(
            png_bytes(40, 20),
            &[("width", "20"), ("height", "10"), ("fit", "fill"), ("rotate", "90")],
        ))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(decode(response.as_bytes()).dimensions(), (10, 20));
}

#[tokio::test]
async fn test_transform_crop_out_of_bounds() {
    let server = default_server();

    let response = server
        .post("/api/transform")
        .multipart(image_form(
            png_bytes(10, 10),
            &[("crop", r#"{"left":5,"top":5,"width":10,"height":10}"#)],
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "OUT_OF_BOUNDS");
}

#[tokio::test]
async fn test_watermark_without_content() {
    let server = default_server();

    let response = server
        .post("/api/watermark")
        .multipart(image_form(png_bytes(20, 20), &[("position", "center")]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No watermark content provided");
}

#[tokio::test]
async fn test_watermark_file_without_text_is_rejected() {
    let server = default_server();
    let form = image_form(png_bytes(20, 20), &[]).add_part("watermark", png_part(png_bytes(4, 4)));

    let response = server.post("/api/watermark").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "NO_WATERMARK_CONTENT");
    assert_eq!(body["error"], "No watermark content provided");
}

#[tokio::test]
async fn test_watermark_file_is_ignored_when_text_present() {
    let server = default_server();
    let form = image_form(png_bytes(60, 30), &[("text", "ok")])
        .add_part("watermark", png_part(png_bytes(4, 4)));

    let response = server.post("/api/watermark").multipart(form).await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(decode(response.as_bytes()).dimensions(), (60, 30));
}

#[tokio::test]
async fn test_transform_oversized_target_fails_request_only() {
    let server = default_server();
    let tall = helpers::encoded_image(1, 10_000, [10, 20, 30, 255], ImageFormat::Png);

    let response = server
        .post("/api/transform")
        .multipart(image_form(tall, &[("width", "10000")]))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "IMAGE_PROCESSING_ERROR");

    // The server keeps answering
    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_watermark_text_returns_png() {
    let server = default_server();

    let response = server
        .post("/api/watermark")
        .multipart(image_form(
            png_bytes(120, 60),
            &[("text", "hi"), ("fontColor", "#00ff00"), ("opacity", "1")],
        ))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(decode(response.as_bytes()).dimensions(), (120, 60));
}

#[tokio::test]
async fn test_enhance_sets_scale_header() {
    let server = default_server();

    let response = server
        .post("/api/enhance")
        .multipart(image_form(png_bytes(10, 10), &[("scale", "2"), ("denoise", "false")]))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-enhancement-scale"), "2");
    assert_eq!(decode(response.as_bytes()).dimensions(), (20, 20));
}

#[tokio::test]
async fn test_remove_background_webp() {
    let server = default_server();
    let white = helpers::encoded_image(6, 6, [255, 255, 255, 255], ImageFormat::Png);

    let response = server
        .post("/api/remove-background")
        .multipart(image_form(white, &[("outputFormat", "webp")]))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/webp");
}

#[tokio::test]
async fn test_rejects_non_image_upload() {
    let server = default_server();
    let part = Part::bytes(bytes::Bytes::from_static(b"%PDF-1.4"))
        .file_name("doc.pdf")
        .mime_type("application/pdf");

    let response = server
        .post("/api/compress")
        .multipart(MultipartForm::new().add_part("image", part))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_oversized_upload() {
    let config = pixelmill_core::Config::default().with_max_file_size_bytes(1024 * 1024);
    let server = helpers::test_server(config);
    let big = vec![0u8; 1024 * 1024 + 1];

    let response = server
        .post("/api/compress")
        .multipart(image_form(big, &[]))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "FILE_TOO_LARGE");
    assert_eq!(body["error"], "File too large. Maximum size is 1MB.");
}

#[tokio::test]
async fn test_undecodable_image_is_server_error() {
    let server = default_server();

    let response = server
        .post("/api/compress")
        .multipart(image_form(b"not really a png".to_vec(), &[]))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Failed to process image");
    assert!(body.get("detail").is_none());
}
