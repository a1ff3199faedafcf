//! Test helpers: build the router from a test `Config` and synthetic images.
//!
//! Run from workspace root: `cargo test -p pixelmill-api`.

use std::io::Cursor;
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pixelmill_api::setup::routes;
use pixelmill_api::state::AppState;
use pixelmill_core::Config;

pub const TEST_DEV_API_KEY: &str = "test-dev-key";

/// Server over the full router (middleware included) for `config`
pub fn test_server(config: Config) -> TestServer {
    let state = Arc::new(AppState::new(config.clone()));
    let app = routes::setup_routes(&config, state).expect("Failed to build router");
    TestServer::new(app.into_make_service()).expect("Failed to create test server")
}

/// Server with the default development configuration
pub fn default_server() -> TestServer {
    test_server(Config::default())
}

/// Solid-color RGBA image encoded in `format`
pub fn encoded_image(width: u32, height: u32, color: [u8; 4], format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("Failed to encode test image");
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded_image(width, height, [200, 40, 40, 255], ImageFormat::Png)
}

pub fn png_part(data: Vec<u8>) -> Part {
    Part::bytes(bytes::Bytes::from(data))
        .file_name("image.png")
        .mime_type("image/png")
}

/// Multipart form with a PNG `image` part plus text fields
pub fn image_form(data: Vec<u8>, fields: &[(&str, &str)]) -> MultipartForm {
    fields.iter().fold(
        MultipartForm::new().add_part("image", png_part(data)),
        |form, (name, value)| form.add_text(name.to_string(), value.to_string()),
    )
}

/// Multipart form with text fields only
pub fn fields_form(fields: &[(&str, &str)]) -> MultipartForm {
    fields.iter().fold(MultipartForm::new(), |form, (name, value)| {
        form.add_text(name.to_string(), value.to_string())
    })
}

pub fn decode(data: &[u8]) -> DynamicImage {
    image::load_from_memory(data).expect("Response is not a decodable image")
}
