//! Pixelmill Core Library
//!
//! This crate provides the error types, configuration, and constants shared by
//! the processing engine and the HTTP API.

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorMetadata, FieldError, LogLevel};
