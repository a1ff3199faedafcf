//! Configuration module
//!
//! Service settings are read once at startup from the process environment
//! (optionally seeded from a `.env` file).

use std::env;

use crate::constants::DEFAULT_MAX_FILE_SIZE_BYTES;

const DEFAULT_PORT: u16 = 3000;
const RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const PROCESSING_TIMEOUT_SECS: u64 = 60;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Log output format for the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    server_port: u16,
    environment: String,
    allowed_origins: Vec<String>,
    require_api_key: bool,
    dev_api_key: Option<String>,
    max_file_size_bytes: usize,
    rate_limit_max_requests: u32,
    rate_limit_window_secs: u64,
    processing_timeout_secs: u64,
    http_concurrency_limit: usize,
    trusted_proxy_count: usize,
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            environment: "development".to_string(),
            allowed_origins: Vec::new(),
            require_api_key: false,
            dev_api_key: None,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            rate_limit_max_requests: RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_secs: RATE_LIMIT_WINDOW_SECS,
            processing_timeout_secs: PROCESSING_TIMEOUT_SECS,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            trusted_proxy_count: 0,
            log_format: LogFormat::Compact,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_PORT),
            environment,
            allowed_origins,
            require_api_key: env::var("REQUIRE_API_KEY")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            dev_api_key: env::var("DEV_API_KEY").ok().filter(|k| !k.is_empty()),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| RATE_LIMIT_MAX_REQUESTS.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_MAX_REQUESTS),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| RATE_LIMIT_WINDOW_SECS.to_string())
                .parse()
                .unwrap_or(RATE_LIMIT_WINDOW_SECS),
            processing_timeout_secs: env::var("PROCESSING_TIMEOUT_SECS")
                .unwrap_or_else(|_| PROCESSING_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(PROCESSING_TIMEOUT_SECS),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            trusted_proxy_count: env::var("TRUSTED_PROXY_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Compact,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.require_api_key && !self.is_production() && self.dev_api_key.is_none() {
            return Err(anyhow::anyhow!(
                "REQUIRE_API_KEY=true requires DEV_API_KEY to be set"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        if self.rate_limit_window_secs == 0 || self.rate_limit_max_requests == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_MAX_REQUESTS and RATE_LIMIT_WINDOW_SECS must be greater than 0"
            ));
        }

        if self.processing_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "PROCESSING_TIMEOUT_SECS must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Empty means any origin is accepted.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub fn require_api_key(&self) -> bool {
        self.require_api_key
    }

    pub fn dev_api_key(&self) -> Option<&str> {
        self.dev_api_key.as_deref()
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_bytes
    }

    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit_max_requests
    }

    pub fn rate_limit_window_secs(&self) -> u64 {
        self.rate_limit_window_secs
    }

    pub fn processing_timeout_secs(&self) -> u64 {
        self.processing_timeout_secs
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.http_concurrency_limit
    }

    /// Proxies in front of the service whose `X-Forwarded-For` entries are trusted
    pub fn trusted_proxy_count(&self) -> usize {
        self.trusted_proxy_count
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    // Builder-style setters, used by tests and embedders that don't read env

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_dev_api_key(mut self, key: impl Into<String>) -> Self {
        self.require_api_key = true;
        self.dev_api_key = Some(key.into());
        self
    }

    pub fn with_max_file_size_bytes(mut self, max: usize) -> Self {
        self.max_file_size_bytes = max;
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.rate_limit_max_requests = max_requests;
        self.rate_limit_window_secs = window_secs;
        self
    }

    pub fn with_processing_timeout_secs(mut self, secs: u64) -> Self {
        self.processing_timeout_secs = secs;
        self
    }
}
