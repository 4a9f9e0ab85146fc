// ABOUTME: Core types and constants for the multi-tenant chat relay
// ABOUTME: Foundation crate with error handling, domain models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Relay Core
//!
//! Foundation crate providing shared types and constants for the chat relay.
//! This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `DatabaseError`
//! - **constants**: Request limits, header names, and fallback values
//! - **models**: Tenant settings, conversation/message/analytics records, classification

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (tenants, conversations, messages, analytics)
pub mod models;
