// ABOUTME: Tenant directory resolving an account number to its relay settings
// ABOUTME: Lazily backfills a missing API key on first read; settings upsert for seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::crypto::generate_api_key;
use chrono::Utc;
use relay_core::errors::DatabaseError;
use relay_core::models::{format_timestamp, AccountNumber, TenantSettings};
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

/// Read access to tenant settings
#[derive(Clone)]
pub struct TenantDirectory {
    pool: SqlitePool,
}

impl TenantDirectory {
    /// Create a new tenant directory
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the settings for `account`
    ///
    /// Returns `None` when the tenant has no settings row. When the row exists
    /// but has no API key, one is generated and stored before returning; if a
    /// concurrent reader stored one first, that key wins.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails
    #[instrument(skip(self), fields(account_number = %account))]
    pub async fn get_settings(
        &self,
        account: AccountNumber,
    ) -> Result<Option<TenantSettings>, DatabaseError> {
        let Some(mut settings) = self.fetch(account).await? else {
            return Ok(None);
        };

        if settings.api_key().is_none() {
            settings.api_key = Some(self.backfill_api_key(account).await?);
        }

        Ok(Some(settings))
    }

    async fn fetch(&self, account: AccountNumber) -> Result<Option<TenantSettings>, DatabaseError> {
        let row = sqlx::query(
            r"
            SELECT account_number, system_prompt, sources, api_key
            FROM account_settings
            WHERE account_number = $1
            ",
        )
        .bind(account.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let sources: Option<String> = r.get("sources");
            TenantSettings {
                account_number: account,
                system_prompt: r.get("system_prompt"),
                sources: TenantSettings::sources_from_json(sources.as_deref()),
                api_key: r.get("api_key"),
            }
        }))
    }

    /// Store a generated key only if the row still has none, then re-read
    async fn backfill_api_key(&self, account: AccountNumber) -> Result<String, DatabaseError> {
        let candidate = generate_api_key();
        let updated = sqlx::query(
            r"
            UPDATE account_settings
            SET api_key = $1, updated_at = $2
            WHERE account_number = $3 AND (api_key IS NULL OR api_key = '')
            ",
        )
        .bind(&candidate)
        .bind(format_timestamp(&Utc::now()))
        .bind(account.get())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            info!(account_number = %account, "Generated API key for tenant");
        }

        let stored: Option<String> =
            sqlx::query_scalar("SELECT api_key FROM account_settings WHERE account_number = $1")
                .bind(account.get())
                .fetch_one(&self.pool)
                .await?;

        stored
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DatabaseError::InvalidData("api_key missing after backfill".to_owned()))
    }

    /// Create or replace a tenant's settings
    ///
    /// A `None` API key keeps the stored key, or generates one if there is
    /// none. Returns the effective settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails
    #[instrument(skip(self, settings), fields(account_number = %settings.account_number))]
    pub async fn upsert_settings(
        &self,
        settings: &TenantSettings,
    ) -> Result<TenantSettings, DatabaseError> {
        sqlx::query(
            r"
            INSERT INTO account_settings (account_number, system_prompt, sources, api_key, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(account_number) DO UPDATE SET
                system_prompt = excluded.system_prompt,
                sources = excluded.sources,
                api_key = COALESCE(excluded.api_key, account_settings.api_key),
                updated_at = excluded.updated_at
            ",
        )
        .bind(settings.account_number.get())
        .bind(settings.system_prompt.as_deref())
        .bind(settings.sources_to_json())
        .bind(settings.api_key())
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get_settings(settings.account_number)
            .await?
            .ok_or_else(|| DatabaseError::InvalidData("tenant missing after upsert".to_owned()))
    }
}
