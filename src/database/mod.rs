// ABOUTME: SQLite database management for the chat relay
// ABOUTME: Connection pool setup, idempotent schema creation, and access to per-domain managers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! One SQLite pool shared by every request. Each domain gets a small
//! manager wrapping a clone of the pool:
//!
//! - [`TenantDirectory`]: tenant settings and the lazy API key backfill
//! - [`ConversationStore`]: the transactional conversation/message/analytics write
//! - [`RecommendationManager`]: tenant idea submissions

mod conversations;
mod recommendations;
mod tenants;

pub use conversations::{ConversationStore, PersistedExchange};
pub use recommendations::{NewRecommendation, RecommendationManager, RecommendationRecord};
pub use tenants::TenantDirectory;

use crate::config::DatabaseUrl;
use crate::crypto::ContentCipher;
use anyhow::{Context, Result};
use relay_core::errors::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const FILE_POOL_MAX_CONNECTIONS: u32 = 10;

/// Database manager owning the shared connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and create the schema
    ///
    /// File databases are created (with their parent directory) when missing.
    /// In-memory databases are pinned to one long-lived connection so every
    /// query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the connection
    /// fails, or the schema cannot be applied
    pub async fn new(url: &DatabaseUrl) -> Result<Self> {
        if let DatabaseUrl::SQLite { path } = url {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&url.to_connection_string())
            .with_context(|| format!("Invalid database URL: {url}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(FILE_POOL_MAX_CONNECTIONS)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .with_context(|| format!("Failed to connect to {url}"))?;

        let db = Self { pool };
        db.migrate().await.context("Failed to apply schema")?;
        info!(database = %url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        self.migrate_tenants().await?;
        self.migrate_conversations().await?;
        self.migrate_recommendations().await?;
        Ok(())
    }

    async fn migrate_tenants(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS account_settings (
                account_number INTEGER PRIMARY KEY,
                system_prompt TEXT,
                sources TEXT,
                api_key TEXT,
                updated_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn migrate_conversations(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                account_number INTEGER NOT NULL,
                player_id TEXT,
                player_username TEXT,
                started_at TEXT NOT NULL,
                last_message_at TEXT NOT NULL,
                topic TEXT,
                sentiment TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                sender TEXT NOT NULL CHECK (sender IN ('user', 'assistant')),
                content_encrypted BLOB NOT NULL,
                created_at TEXT NOT NULL,
                is_troll INTEGER NOT NULL DEFAULT 0,
                source_client TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS analytics (
                id TEXT PRIMARY KEY,
                player_id TEXT NOT NULL,
                account_number INTEGER NOT NULL,
                country TEXT NOT NULL,
                inferred_age_range TEXT,
                source_client TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_account ON conversations(account_number, last_message_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_analytics_account ON analytics(account_number, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn migrate_recommendations(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recommendations (
                id TEXT PRIMARY KEY,
                account_number INTEGER NOT NULL,
                player_id INTEGER NOT NULL,
                recommendation TEXT NOT NULL,
                source_type TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Round-trip `SELECT 1` used by the readiness probe
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can run the query
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Tenant settings manager
    #[must_use]
    pub fn tenants(&self) -> TenantDirectory {
        TenantDirectory::new(self.pool.clone())
    }

    /// Conversation writer/reader using `cipher` for message content
    #[must_use]
    pub fn conversations(&self, cipher: ContentCipher) -> ConversationStore {
        ConversationStore::new(self.pool.clone(), cipher)
    }

    /// Recommendation manager
    #[must_use]
    pub fn recommendations(&self) -> RecommendationManager {
        RecommendationManager::new(self.pool.clone())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
