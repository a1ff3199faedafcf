//! Pixelmill API Library
//!
//! This crate provides the HTTP handlers, middleware, and application setup
//! in front of the image engine.

pub mod auth;
pub mod constants;
pub mod error;
mod handlers;
mod middleware;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;
mod validation;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
