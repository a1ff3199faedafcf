//! Request authentication for the image routes.

pub mod middleware;

pub use middleware::{auth_middleware, AuthState, RapidApiUser};
