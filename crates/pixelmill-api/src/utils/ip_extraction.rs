//! Client IP extraction for per-client rate limiting.
//!
//! `X-Forwarded-For` is only honoured up to the configured number of trusted
//! proxies so a client cannot pick its own rate limit bucket.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client IP from forwarding headers or the peer socket.
///
/// Order: `X-Forwarded-For` (respecting `trusted_proxy_count`), `X-Real-IP`,
/// then the socket address. Returns `"unknown"` if nothing usable is found.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| extract_from_forwarded_for(v, trusted_proxy_count))
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_valid_ip(v))
    {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// `client, proxy1, proxy2`: with N trusted proxies the client is the entry
/// just before the last N. With none trusted, the closest hop is used.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if trusted_proxy_count == 0 || ips.len() <= trusted_proxy_count {
        ips.last()?
    } else {
        ips.get(ips.len() - trusted_proxy_count - 1)?
    };

    is_valid_ip(candidate).then(|| candidate.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}
