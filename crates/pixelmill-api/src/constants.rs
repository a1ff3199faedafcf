/// Prefix for every image operation route
pub const API_PREFIX: &str = "/api";

/// Display name reported by the info endpoint
pub const SERVICE_NAME: &str = "Image Processing API";

/// Public API version reported by the info endpoint
pub const SERVICE_VERSION: &str = "1.0.0";

pub const RAPIDAPI_KEY_HEADER: &str = "x-rapidapi-key";
pub const RAPIDAPI_HOST_HEADER: &str = "x-rapidapi-host";
pub const RAPIDAPI_USER_HEADER: &str = "x-rapidapi-user";
pub const DEV_API_KEY_HEADER: &str = "x-api-key";
