// ABOUTME: Storage for tenant-submitted recommendations (player ideas)
// ABOUTME: Inserts new submissions with status "New" and lists them per tenant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::Utc;
use relay_core::constants::relay::RECOMMENDATION_STATUS_NEW;
use relay_core::errors::DatabaseError;
use relay_core::models::{format_timestamp, AccountNumber};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A validated recommendation submission
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    /// Owning tenant
    pub account_number: AccountNumber,
    /// Submitting player
    pub player_id: i64,
    /// Free-text ideas
    pub ideas: String,
    /// Declared source type
    pub source_type: String,
}

/// Database representation of a recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    /// Row id
    pub id: String,
    /// Owning tenant
    pub account_number: i64,
    /// Submitting player
    pub player_id: i64,
    /// Free-text ideas
    pub recommendation: String,
    /// Declared source type
    pub source_type: String,
    /// Review status
    pub status: String,
    /// Submission time
    pub created_at: String,
}

/// Recommendation database operations manager
#[derive(Clone)]
pub struct RecommendationManager {
    pool: SqlitePool,
}

impl RecommendationManager {
    /// Create a new recommendation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a submission with status "New"
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create(&self, submission: &NewRecommendation) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r"
            INSERT INTO recommendations (id, account_number, player_id, recommendation, source_type, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&id)
        .bind(submission.account_number.get())
        .bind(submission.player_id)
        .bind(&submission.ideas)
        .bind(&submission.source_type)
        .bind(RECOMMENDATION_STATUS_NEW)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Submissions for a tenant, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_for_account(
        &self,
        account: AccountNumber,
    ) -> Result<Vec<RecommendationRecord>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, account_number, player_id, recommendation, source_type, status, created_at
            FROM recommendations
            WHERE account_number = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(account.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| RecommendationRecord {
                id: r.get("id"),
                account_number: r.get("account_number"),
                player_id: r.get("player_id"),
                recommendation: r.get("recommendation"),
                source_type: r.get("source_type"),
                status: r.get("status"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
