// ABOUTME: Cryptography module for message encryption and tenant key material
// ABOUTME: Centralizes all cryptographic operations for the chat relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Cryptographic utilities

/// AES-256-GCM encryption of message content at rest
pub mod content;
/// Tenant API key generation and comparison
pub mod keys;

pub use content::ContentCipher;
pub use keys::{constant_time_eq, generate_api_key};
