// ABOUTME: Chat relay route: validate, authorize, generate, then stream meta/token/done
// ABOUTME: Mounted at /v1/chat/stream and the /chat alias; failures answer with a JSON error body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Chat routes
//!
//! The handler does all fallible work before the response starts:
//! body validation, tenant authorization, and the generation call. Only
//! then is the event stream opened.

use super::validation::{parse_body, Issues};
use crate::constants::headers::API_KEY;
use crate::constants::limits::{COUNTRY_CODE_LEN, MESSAGE_MAX_CHARS};
use crate::errors::AppError;
use crate::relay::{stream_exchange, RelayTurn};
use crate::resources::ServerResources;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use relay_core::models::AccountNumber;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Accepted values for `gender`
const GENDERS: [&str; 4] = ["male", "female", "other", "unknown"];

/// Optional location block
#[derive(Debug, Default, Deserialize)]
pub struct Location {
    /// ISO 3166-1 alpha-2 country code
    pub country: Option<String>,
    /// Region name
    pub region: Option<String>,
    /// City name
    pub city: Option<String>,
}

/// Client timestamp as either text or epoch number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClientTimestamp {
    /// Epoch value
    Number(i64),
    /// Formatted text
    Text(String),
}

/// Chat request body as sent by the client
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamBody {
    /// Message text
    pub message: Option<String>,
    /// Tenant id
    pub account_number: Option<i64>,
    /// End-user identifier
    pub player_id: Option<String>,
    /// End-user display name
    pub player_username: Option<String>,
    /// Client session id
    pub session_id: Option<String>,
    /// Conversation to append to
    pub conversation_id: Option<String>,
    /// Declared source-client label
    pub source_client: Option<String>,
    /// End-user gender
    pub gender: Option<String>,
    /// End-user location
    pub location: Option<Location>,
    /// Client-side send time
    pub client_timestamp: Option<ClientTimestamp>,
}

/// A chat request that passed validation
#[derive(Debug, Clone)]
pub struct ChatStreamRequest {
    /// Message text, untrimmed
    pub message: String,
    /// Tenant id
    pub account_number: AccountNumber,
    /// End-user identifier
    pub player_id: Option<String>,
    /// End-user display name
    pub player_username: Option<String>,
    /// Canonical conversation id, generated when absent
    pub conversation_id: String,
    /// Declared source-client label
    pub source_client: Option<String>,
    /// Upper-cased country code
    pub country: Option<String>,
}

impl ChatStreamRequest {
    /// Decode and validate a raw request body
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every problem found
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        Self::validate(parse_body(body)?)
    }

    /// Validate a decoded body
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every problem found
    pub fn validate(body: ChatStreamBody) -> Result<Self, AppError> {
        let mut issues = Issues::default();

        let message = issues.required(&["message"], body.message);
        if let Some(message) = &message {
            issues.check_length(&["message"], message, 1, MESSAGE_MAX_CHARS);
        }

        let account_number = issues
            .required(&["accountNumber"], body.account_number)
            .and_then(|n| match AccountNumber::new(n) {
                Ok(account) => Some(account),
                Err(_) => {
                    issues.push(&["accountNumber"], "Must be a positive integer");
                    None
                }
            });

        let conversation_id = match body.conversation_id.as_deref().map(Uuid::parse_str) {
            Some(Ok(id)) => id.hyphenated().to_string(),
            Some(Err(_)) => {
                issues.push(&["conversationId"], "Invalid uuid");
                String::new()
            }
            None => Uuid::new_v4().hyphenated().to_string(),
        };

        if let Some(gender) = body.gender.as_deref() {
            if !GENDERS.contains(&gender) {
                issues.push(
                    &["gender"],
                    "Invalid enum value. Expected 'male' | 'female' | 'other' | 'unknown'",
                );
            }
        }

        let country = body.location.and_then(|location| location.country);
        if let Some(code) = &country {
            if code.len() != COUNTRY_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                issues.push(&["location", "country"], "Must be a two-letter country code");
            }
        }

        let (Some(message), Some(account_number)) = (message, account_number) else {
            return Err(issues.into_error());
        };

        issues.finish(Self {
            message,
            account_number,
            player_id: non_empty(body.player_id),
            player_username: non_empty(body.player_username),
            conversation_id,
            source_client: body.source_client,
            country: country.map(|c| c.to_ascii_uppercase()),
        })
    }

    /// Build the relay turn with the authorized source label
    #[must_use]
    pub fn into_turn(self, source_client: Option<String>, received_at: DateTime<Utc>) -> RelayTurn {
        RelayTurn {
            conversation_id: self.conversation_id,
            account_number: self.account_number,
            player_id: self.player_id,
            player_username: self.player_username,
            source_client,
            country: self.country,
            message: self.message,
            received_at,
        }
    }
}

// An empty id would occupy the merge-once column in place of a later real one
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Chat routes implementation
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create the chat relay routes (without rate limiting)
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/v1/chat/stream", post(Self::stream_chat))
            .route("/chat", post(Self::stream_chat))
            .with_state(resources)
    }

    #[instrument(skip_all, fields(account_number, conversation_id))]
    async fn stream_chat(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, AppError> {
        let received_at = Utc::now();
        let request = ChatStreamRequest::from_body(&body)?;

        let span = tracing::Span::current();
        span.record("account_number", request.account_number.get());
        span.record("conversation_id", request.conversation_id.as_str());

        let presented_key = headers.get(API_KEY).and_then(|v| v.to_str().ok());
        let tenant = resources
            .gate
            .authorize(
                request.account_number,
                presented_key,
                request.source_client.as_deref(),
            )
            .await
            .map_err(|e| e.into_app_error("sourceClient"))?;

        let turn = request.into_turn(tenant.source_client, received_at);
        let exchange = resources
            .relay
            .generate(turn, tenant.settings.system_prompt())
            .await
            .map_err(|e| {
                warn!(error = %e, "Generation failed");
                AppError::upstream().with_source(e)
            })?;

        info!(
            reply_chars = exchange.assistant_reply.chars().count(),
            "Reply generated, streaming"
        );
        stream_exchange(resources.recorder(), exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use serde_json::json;

    fn validate(value: serde_json::Value) -> Result<ChatStreamRequest, AppError> {
        ChatStreamRequest::from_body(value.to_string().as_bytes())
    }

    fn detail_paths(error: &AppError) -> Vec<serde_json::Value> {
        error
            .details
            .as_ref()
            .and_then(|d| d.as_array())
            .map(|entries| entries.iter().map(|e| e["path"].clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_minimal_body_gets_generated_conversation_id() {
        let request = validate(json!({"message": "hi", "accountNumber": 1})).unwrap();
        assert!(Uuid::parse_str(&request.conversation_id).is_ok());
        assert_eq!(request.country, None);
    }

    #[test]
    fn test_empty_player_fields_are_treated_as_absent() {
        let request = validate(json!({
            "message": "hi",
            "accountNumber": 1,
            "playerId": "",
            "playerUsername": ""
        }))
        .unwrap();
        assert_eq!(request.player_id, None);
        assert_eq!(request.player_username, None);

        let request = validate(json!({
            "message": "hi",
            "accountNumber": 1,
            "playerId": "p-9",
            "playerUsername": "captain"
        }))
        .unwrap();
        assert_eq!(request.player_id.as_deref(), Some("p-9"));
        assert_eq!(request.player_username.as_deref(), Some("captain"));
    }

    #[test]
    fn test_missing_fields_keep_other_issues() {
        let error = validate(json!({"gender": "robot"})).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidInput);
        let paths = detail_paths(&error);
        assert!(paths.contains(&json!(["message"])));
        assert!(paths.contains(&json!(["accountNumber"])));
        assert!(paths.contains(&json!(["gender"])));
    }

    #[test]
    fn test_conversation_id_is_canonicalized() {
        let request = validate(json!({
            "message": "hi",
            "accountNumber": 1,
            "conversationId": "6F9619FF-8B86-D011-B42D-00C04FC964FF"
        }))
        .unwrap();
        assert_eq!(request.conversation_id, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn test_country_is_uppercased() {
        let request = validate(json!({
            "message": "hi",
            "accountNumber": 1,
            "location": {"country": "us", "city": "Austin"}
        }))
        .unwrap();
        assert_eq!(request.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_all_field_issues_reported_together() {
        let error = validate(json!({
            "message": "",
            "accountNumber": 0,
            "conversationId": "nope",
            "gender": "robot",
            "location": {"country": "USA"}
        }))
        .unwrap_err();
        assert_eq!(error.message, "Validation failed");
        assert_eq!(
            detail_paths(&error),
            vec![
                json!(["message"]),
                json!(["accountNumber"]),
                json!(["conversationId"]),
                json!(["gender"]),
                json!(["location", "country"]),
            ]
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let error = validate(json!({})).unwrap_err();
        assert_eq!(
            detail_paths(&error),
            vec![json!(["message"]), json!(["accountNumber"])]
        );
    }

    #[test]
    fn test_message_limit_is_in_characters() {
        assert!(validate(json!({"message": "ü".repeat(300), "accountNumber": 1})).is_ok());
        assert!(validate(json!({"message": "a".repeat(301), "accountNumber": 1})).is_err());
        assert_eq!(
            validate(json!({"message": "  x  ", "accountNumber": 1}))
                .unwrap()
                .message,
            "  x  "
        );
    }

    #[test]
    fn test_client_timestamp_accepts_string_or_int() {
        assert!(validate(json!({"message": "a", "accountNumber": 1, "clientTimestamp": 1_700_000_000})).is_ok());
        assert!(validate(json!({"message": "a", "accountNumber": 1, "clientTimestamp": "2024-01-01T00:00:00Z"})).is_ok());
        assert!(validate(json!({"message": "a", "accountNumber": 1, "clientTimestamp": true})).is_err());
    }

    #[test]
    fn test_type_error_is_single_entry() {
        let error = validate(json!({"message": 5, "accountNumber": "x"})).unwrap_err();
        assert_eq!(detail_paths(&error).len(), 1);
    }
}
