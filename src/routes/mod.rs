// ABOUTME: Route module organization for the chat relay HTTP endpoints
// ABOUTME: Each domain module exposes a routes() constructor taking the shared resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route modules
//!
//! Handlers stay thin: they decode and validate the body, then delegate to
//! the authorization gate, the relay, or the database managers.

/// Chat relay routes
pub mod chat;
/// Health check routes
pub mod health;
/// Recommendation submission routes
pub mod recommendations;
/// Body decoding and validation helpers
pub mod validation;

pub use chat::{ChatRoutes, ChatStreamRequest};
pub use health::HealthRoutes;
pub use recommendations::{validate_recommendation, RecommendationRoutes};
pub use validation::ValidationIssue;
