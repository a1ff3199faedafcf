use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pixelmill_core::AppError;
use tokio::sync::Mutex;

use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;

const DEFAULT_SHARDS: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

/// Request counter for one client within the current fixed window
#[derive(Debug, Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> Option<u32> {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            Some(limit - self.count)
        } else {
            None
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Fixed-window rate limiter keyed by client.
///
/// Keys are spread across independently locked shards to keep contention
/// low under concurrent load.
#[derive(Debug)]
pub struct HttpRateLimiter {
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
    limit: u32,
    window: Duration,
}

impl HttpRateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self::with_shards(limit, window_secs, DEFAULT_SHARDS)
    }

    pub fn with_shards(limit: u32, window_secs: u64, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_for(&self, key: &str) -> &Mutex<HashMap<String, RateLimitBucket>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Count one request for `key`.
    ///
    /// Returns the remaining allowance, or the time until the window resets
    /// when the limit is already reached.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let mut buckets = self.shard_for(key).lock().await;

        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.reset_at > now);
            tracing::debug!(
                evicted = before - buckets.len(),
                "Dropped expired rate limit buckets"
            );

            if buckets.len() >= MAX_BUCKETS_PER_SHARD {
                let oldest = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    buckets.remove(&oldest);
                }
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.window));

        bucket
            .check_and_increment(self.limit, self.window)
            .ok_or_else(|| bucket.reset_in())
    }
}

#[derive(Debug)]
pub struct RateLimitState {
    pub limiter: HttpRateLimiter,
    pub trusted_proxy_count: usize,
}

fn set_header(response: &mut Response, name: &'static str, value: impl ToString) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, value);
    }
}

/// Per-IP rate limiting for the image routes.
///
/// Adds `X-RateLimit-Limit` / `X-RateLimit-Remaining` to every response and
/// answers `429` with `Retry-After` once the window's allowance is spent.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitState>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        state.trusted_proxy_count,
    );
    let key = format!("ip:{}", ip);
    let limit = state.limiter.limit();

    match state.limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_header(&mut response, "X-RateLimit-Limit", limit);
            set_header(&mut response, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(reset_in) => {
            tracing::warn!(
                client = %ip,
                path = %request.uri().path(),
                limit = limit,
                "Rate limit exceeded"
            );

            let mut response = HttpAppError(AppError::RateLimited {
                retry_after_secs: reset_in.as_secs().max(1),
            })
            .into_response();
            set_header(&mut response, "X-RateLimit-Limit", limit);
            set_header(&mut response, "X-RateLimit-Remaining", 0);
            response
        }
    }
}
