// ABOUTME: Recommendation submission route guarded by the tenant authorization gate
// ABOUTME: Validates the body, checks key and sourceType, and stores one row with status New
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::validation::{parse_body, Issues};
use crate::constants::headers::API_KEY;
use crate::constants::limits::{IDEAS_MAX_CHARS, SOURCE_TYPE_MAX_CHARS};
use crate::database::NewRecommendation;
use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use relay_core::models::AccountNumber;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Integer field that also accepts its decimal string form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    /// JSON number
    Number(i64),
    /// JSON string holding a number
    Text(String),
}

impl NumericField {
    fn positive(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
        .filter(|n| *n > 0)
    }
}

/// Recommendation body as sent by the client
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationBody {
    /// Tenant id
    pub account_number: Option<NumericField>,
    /// Submitting player
    pub player_id: Option<NumericField>,
    /// Free-text ideas
    pub ideas: Option<String>,
    /// Declared source type
    pub source_type: Option<String>,
}

/// Success body
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionAccepted {
    /// Always true
    pub ok: bool,
}

/// Decode and validate a recommendation body
///
/// # Errors
///
/// Returns a validation error listing every problem found
pub fn validate_recommendation(body: &[u8]) -> Result<NewRecommendation, AppError> {
    let body: RecommendationBody = parse_body(body)?;
    let mut issues = Issues::default();

    let account_number = issues
        .required(&["accountNumber"], body.account_number)
        .and_then(|field| {
            let account = field.positive().and_then(|n| AccountNumber::new(n).ok());
            if account.is_none() {
                issues.push(&["accountNumber"], "Must be a positive integer");
            }
            account
        });
    let player_id = issues
        .required(&["playerId"], body.player_id)
        .and_then(|field| {
            let id = field.positive();
            if id.is_none() {
                issues.push(&["playerId"], "Must be a positive integer");
            }
            id
        });
    let ideas = issues.required(&["ideas"], body.ideas);
    if let Some(ideas) = &ideas {
        issues.check_length(&["ideas"], ideas, 1, IDEAS_MAX_CHARS);
    }
    let source_type = issues.required(&["sourceType"], body.source_type);
    if let Some(source_type) = &source_type {
        issues.check_length(&["sourceType"], source_type, 1, SOURCE_TYPE_MAX_CHARS);
    }

    match (account_number, player_id, ideas, source_type) {
        (Some(account_number), Some(player_id), Some(ideas), Some(source_type)) => {
            issues.finish(NewRecommendation {
                account_number,
                player_id,
                ideas,
                source_type,
            })
        }
        _ => Err(issues.into_error()),
    }
}

/// Recommendation routes implementation
pub struct RecommendationRoutes;

impl RecommendationRoutes {
    /// Create the recommendation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/v1/recommendations", post(Self::submit))
            .with_state(resources)
    }

    #[instrument(skip_all, fields(account_number))]
    async fn submit(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<SubmissionAccepted>, AppError> {
        let mut submission = validate_recommendation(&body)?;
        tracing::Span::current().record("account_number", submission.account_number.get());

        let presented_key = headers.get(API_KEY).and_then(|v| v.to_str().ok());
        let tenant = resources
            .gate
            .authorize(
                submission.account_number,
                presented_key,
                Some(submission.source_type.as_str()),
            )
            .await
            .map_err(|e| e.into_app_error("sourceType"))?;
        if let Some(source) = tenant.source_client {
            submission.source_type = source;
        }

        let id = resources
            .recommendations
            .create(&submission)
            .await
            .map_err(|e| AppError::storage("Failed to store recommendation").with_source(e))?;

        info!(recommendation_id = %id, "Recommendation stored");
        Ok(Json(SubmissionAccepted { ok: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: serde_json::Value) -> Result<NewRecommendation, AppError> {
        validate_recommendation(value.to_string().as_bytes())
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let submission = validate(json!({
            "accountNumber": "42",
            "playerId": 7,
            "ideas": "More maps",
            "sourceType": "lobby"
        }))
        .unwrap();
        assert_eq!(submission.account_number.get(), 42);
        assert_eq!(submission.player_id, 7);
    }

    #[test]
    fn test_non_positive_ids_rejected() {
        let error = validate(json!({
            "accountNumber": "0",
            "playerId": -3,
            "ideas": "x",
            "sourceType": "lobby"
        }))
        .unwrap_err();
        assert_eq!(error.details.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_length_limits() {
        assert!(validate(json!({
            "accountNumber": 1,
            "playerId": 1,
            "ideas": "i".repeat(4001),
            "sourceType": "s".repeat(65)
        }))
        .is_err());
        assert!(validate(json!({
            "accountNumber": 1,
            "playerId": 1,
            "ideas": "i".repeat(4000),
            "sourceType": "s".repeat(64)
        }))
        .is_ok());
    }
}
