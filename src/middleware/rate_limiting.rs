// ABOUTME: Fixed-window per-client rate limiting for the chat routes
// ABOUTME: Adds X-RateLimit-* headers to every response and rejects excess requests with 429
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting Middleware with HTTP Headers
//!
//! Clients are keyed by the first `x-forwarded-for` entry, falling back to
//! the socket peer address. Each key gets `max_requests` per window; the
//! window starts with the key's first request.

use crate::config::RateLimitConfig;
use crate::constants::headers::FORWARDED_FOR;
use crate::errors::AppError;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use dashmap::DashMap;
use http::{HeaderMap, HeaderValue};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// HTTP header names for rate limiting
pub mod headers {
    /// HTTP header name for maximum requests allowed in the current window
    pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    /// HTTP header name for remaining requests in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    /// HTTP header name for Unix timestamp when the window resets
    pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    /// HTTP header name for retry-after duration in seconds
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// Key used when neither a forwarded address nor a peer address is known
const UNKNOWN_CLIENT: &str = "unknown";

/// Number of tracked clients above which expired windows are swept
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests allowed per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the current window ends
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Headers describing this decision
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(headers::X_RATE_LIMIT_LIMIT, HeaderValue::from(self.limit));
        map.insert(headers::X_RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));

        let reset_secs = self.reset_after.as_secs() + u64::from(self.reset_after.subsec_nanos() > 0);
        let reset_at = Utc::now().timestamp().saturating_add_unsigned(reset_secs);
        map.insert(headers::X_RATE_LIMIT_RESET, HeaderValue::from(reset_at));

        if !self.allowed {
            map.insert(headers::RETRY_AFTER, HeaderValue::from(reset_secs.max(1)));
        }
        map
    }
}

/// In-memory fixed-window counter shared by all chat requests
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Create a limiter with the given window and budget
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Count a request from `client` at `now`
    pub fn check_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let limit = self.config.max_requests;
        let window = self.config.window;
        let mut entry = self.windows.entry(client.to_owned()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < limit;
        if allowed {
            entry.count += 1;
        }

        RateLimitDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_after: window.saturating_sub(now.saturating_duration_since(entry.started)),
        }
    }

    /// Count a request from `client` now
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    /// Drop windows that have already ended
    fn sweep(&self, now: Instant) {
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }
}

/// Identify the client for rate limiting purposes
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}

/// Axum middleware enforcing the chat rate limit
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer);
    let decision = limiter.check(&client);

    if !decision.allowed {
        warn!(client = %client, limit = decision.limit, "Rate limit exceeded");
        return (decision.headers(), AppError::rate_limited()).into_response();
    }

    let mut response = next.run(req).await;
    response.headers_mut().extend(decision.headers());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window: Duration::from_millis(window_ms),
            max_requests,
        })
    }

    #[test]
    fn test_budget_exhausts_then_resets() {
        let limiter = limiter(2, 1000);
        let start = Instant::now();

        assert_eq!(limiter.check_at("a", start).remaining, 1);
        assert!(limiter.check_at("a", start).allowed);
        let denied = limiter.check_at("a", start + Duration::from_millis(10));
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);

        assert!(limiter.check_at("a", start + Duration::from_millis(1000)).allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 1000);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
    }

    #[test]
    fn test_client_key_prefers_first_forwarded_entry() {
        let mut map = HeaderMap::new();
        map.insert(FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(client_key(&map, Some(peer)), "203.0.113.9");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer)), "127.0.0.1");
        assert_eq!(client_key(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_denied_decision_carries_retry_after() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_after: Duration::from_millis(1500),
        };
        let map = decision.headers();
        assert_eq!(map[headers::RETRY_AFTER], "2");
        assert_eq!(map[headers::X_RATE_LIMIT_LIMIT], "5");
        assert_eq!(map[headers::X_RATE_LIMIT_REMAINING], "0");
        assert!(map.contains_key(headers::X_RATE_LIMIT_RESET));
    }
}
