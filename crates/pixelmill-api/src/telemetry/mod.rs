//! Tracing subscriber setup and per-request spans.

mod init;

pub use init::{init_telemetry, make_request_span};
