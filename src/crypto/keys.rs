// ABOUTME: Tenant API key generation and constant-time comparison
// ABOUTME: Keys are `ck_` followed by 32 random alphanumeric characters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

/// Prefix of generated tenant keys
pub const API_KEY_PREFIX: &str = "ck_";
const API_KEY_RANDOM_CHARS: usize = 32;

/// Generate a fresh tenant API key
#[must_use]
pub fn generate_api_key() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_CHARS)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{random}")
}

/// Exact byte equality without early exit on the first mismatch
#[must_use]
pub fn constant_time_eq(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
