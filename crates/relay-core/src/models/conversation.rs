// ABOUTME: Conversation, message, and analytics records for database persistence
// ABOUTME: Exchange input type written by the conversation store in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::tenant::AccountNumber;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Render a timestamp in the fixed-width form used for every stored column
///
/// Always UTC with microsecond precision and a `Z` suffix, so lexical
/// order matches chronological order.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Sender of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// End user
    User,
    /// Generated reply
    Assistant,
}

impl SenderRole {
    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a stored label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One completed user/assistant turn, ready to be persisted
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Canonical conversation id
    pub conversation_id: String,
    /// Owning tenant
    pub account_number: AccountNumber,
    /// End-user identifier
    pub player_id: Option<String>,
    /// End-user display name
    pub player_username: Option<String>,
    /// Effective source-client label
    pub source_client: Option<String>,
    /// Upper-cased two-letter country code
    pub country: Option<String>,
    /// Message text as submitted
    pub user_message: String,
    /// Generated reply text
    pub assistant_reply: String,
    /// When the request was received
    pub received_at: DateTime<Utc>,
    /// When the reply was obtained
    pub replied_at: DateTime<Utc>,
}

impl Exchange {
    /// Whether this exchange produces an analytics row
    #[must_use]
    pub fn has_analytics(&self) -> bool {
        self.player_id.as_deref().is_some_and(|id| !id.is_empty()) && self.country.is_some()
    }
}

/// Database representation of a conversation aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Conversation id
    pub id: String,
    /// Owning tenant
    pub account_number: i64,
    /// End-user identifier
    pub player_id: Option<String>,
    /// End-user display name
    pub player_username: Option<String>,
    /// First message time
    pub started_at: String,
    /// Latest message time
    pub last_message_at: String,
    /// Topic label, fixed by the first enriched write
    pub topic: Option<String>,
    /// Sentiment label, fixed by the first enriched write
    pub sentiment: Option<String>,
}

/// Database representation of a message with its content decrypted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id
    pub id: String,
    /// Owning conversation
    pub conversation_id: String,
    /// Sender role
    pub sender: SenderRole,
    /// Decrypted content
    pub content: String,
    /// Creation time
    pub created_at: String,
    /// Abuse flag (always false for assistant messages)
    pub is_troll: bool,
    /// Source-client label
    pub source_client: Option<String>,
}

/// Database representation of an analytics row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    /// Row id
    pub id: String,
    /// End-user identifier
    pub player_id: String,
    /// Owning tenant
    pub account_number: i64,
    /// Two-letter country code
    pub country: String,
    /// Reserved; never populated by the relay
    pub inferred_age_range: Option<String>,
    /// Source-client label
    pub source_client: Option<String>,
    /// Creation time
    pub created_at: String,
}
