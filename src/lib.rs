// ABOUTME: Main library entry point for the multi-tenant chat relay
// ABOUTME: Authenticated SSE relay over Gemini with detached enrichment and encrypted persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Chat Relay
//!
//! A multi-tenant conversational relay. A client posts a short message with
//! its tenant's `x-api-key`; the relay authorizes it, forwards the message
//! (optionally prefixed with the tenant's system prompt) to Gemini, and
//! streams the reply back as three server-sent events: `meta`, `token`, `done`.
//!
//! Once the reply has been handed to the client, a detached unit of work
//! classifies the user message (topic, sentiment, troll flag) and writes the
//! conversation, both messages (encrypted), and an optional analytics row in
//! one transaction. Failures in that unit are logged and never reach the
//! caller.
//!
//! ## Architecture
//!
//! - **auth**: Authorization gate (tenant key and source allow-list)
//! - **relay**: Prompt composition, the generation call, and the event stream
//! - **enrichment**: Best-effort classifier with neutral fallback
//! - **database**: Tenant directory, conversation store, recommendations
//! - **routes**: Axum routers for chat, recommendations, and health
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chat_relay::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Chat relay configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Authorization gate for tenant-scoped requests
pub mod auth;

/// Environment-driven server configuration
pub mod config;

/// Application constants (re-exported from `relay-core`)
pub mod constants;

/// Message content encryption at rest
pub mod crypto;

/// SQLite persistence: tenants, conversations, recommendations
pub mod database;

/// Best-effort classification of user messages
pub mod enrichment;

/// Unified error handling (re-exported from `relay-core`)
pub mod errors;

/// LLM provider abstraction and the Gemini client
pub mod llm;

/// Structured logging setup
pub mod logging;

/// HTTP middleware (rate limiting)
pub mod middleware;

/// Domain models (re-exported from `relay-core`)
pub mod models;

/// Prompt composition, generation, and the SSE event sequence
pub mod relay;

/// Shared server resources
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// Router assembly and the HTTP server loop
pub mod server;
