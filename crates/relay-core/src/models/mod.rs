// ABOUTME: Core data models for the multi-tenant chat relay
// ABOUTME: Re-exports tenant settings, conversation records, and classification types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - `AccountNumber` / `TenantSettings`: tenant identity and relay settings
//! - `ConversationRecord` / `MessageRecord` / `AnalyticsRecord`: persisted rows
//! - `Exchange`: one completed user/assistant turn awaiting persistence
//! - `Classification` / `Sentiment`: enrichment output

mod conversation;
mod enrichment;
mod tenant;

pub use conversation::{
    format_timestamp, AnalyticsRecord, ConversationRecord, Exchange, MessageRecord, SenderRole,
};
pub use enrichment::{Classification, Sentiment, UnknownSentiment};
pub use tenant::{AccountNumber, InvalidAccountNumber, TenantSettings};
