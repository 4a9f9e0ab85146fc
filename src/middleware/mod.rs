// ABOUTME: HTTP middleware applied in front of the relay routes
// ABOUTME: Currently the per-client fixed-window rate limiter

pub mod rate_limiting;

// Rate limiting middleware and utilities
pub use rate_limiting::{
    client_key, headers, rate_limit_middleware, RateLimitDecision, RateLimiter,
};
