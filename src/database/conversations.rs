// ABOUTME: Conversation store writing one exchange per transaction with merge-upsert semantics
// ABOUTME: Conversation upsert, two encrypted messages, optional analytics row; plus decrypting readers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::crypto::ContentCipher;
use relay_core::errors::DatabaseError;
use relay_core::models::{
    format_timestamp, AccountNumber, AnalyticsRecord, Classification, ConversationRecord,
    Exchange, MessageRecord, SenderRole,
};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Ids of the rows written for one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedExchange {
    /// User message row
    pub user_message_id: String,
    /// Assistant message row
    pub assistant_message_id: String,
    /// Analytics row, when one was written
    pub analytics_id: Option<String>,
}

/// Sole writer of conversations, messages, and analytics
#[derive(Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
    cipher: ContentCipher,
}

impl ConversationStore {
    /// Create a new conversation store
    #[must_use]
    pub const fn new(pool: SqlitePool, cipher: ContentCipher) -> Self {
        Self { pool, cipher }
    }

    /// Persist one exchange atomically
    ///
    /// In order, inside one transaction: merge-upsert the conversation, insert
    /// the user message, insert the assistant message, and insert an analytics
    /// row when both a player id and a country are present. Any failure rolls
    /// the whole exchange back.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or any statement fails
    #[instrument(
        skip(self, exchange, classification),
        fields(conversation_id = %exchange.conversation_id, account_number = %exchange.account_number)
    )]
    pub async fn persist_exchange(
        &self,
        exchange: &Exchange,
        classification: &Classification,
    ) -> Result<PersistedExchange, DatabaseError> {
        // Encrypt before opening the transaction so no connection is held for it
        let user_content = self.cipher.encrypt(&exchange.user_message)?;
        let assistant_content = self.cipher.encrypt(&exchange.assistant_reply)?;

        let mut tx = self.pool.begin().await?;

        Self::upsert_conversation(&mut tx, exchange, classification).await?;

        let user_message_id = Self::insert_message(
            &mut tx,
            exchange,
            SenderRole::User,
            &user_content,
            classification.troll,
            &format_timestamp(&exchange.received_at),
        )
        .await?;

        let assistant_message_id = Self::insert_message(
            &mut tx,
            exchange,
            SenderRole::Assistant,
            &assistant_content,
            false,
            &format_timestamp(&exchange.replied_at),
        )
        .await?;

        let analytics_id = match (exchange.player_id.as_deref(), exchange.country.as_deref()) {
            (Some(player_id), Some(country)) if exchange.has_analytics() => {
                Some(Self::insert_analytics(&mut tx, exchange, player_id, country).await?)
            }
            _ => None,
        };

        tx.commit().await?;

        debug!(
            analytics = analytics_id.is_some(),
            troll = classification.troll,
            "Exchange persisted"
        );

        Ok(PersistedExchange {
            user_message_id,
            assistant_message_id,
            analytics_id,
        })
    }

    /// Insert the conversation, or merge into the existing row
    ///
    /// On conflict `last_message_at` only moves forward, and the nullable
    /// descriptive columns are filled only where they are still null, so the
    /// outcome does not depend on which concurrent exchange commits first.
    /// A conversation id owned by another account is never merged into.
    async fn upsert_conversation(
        tx: &mut Transaction<'_, Sqlite>,
        exchange: &Exchange,
        classification: &Classification,
    ) -> Result<(), DatabaseError> {
        let started_at = format_timestamp(&exchange.received_at);
        let last_message_at = format_timestamp(&exchange.replied_at);

        let result = sqlx::query(
            r"
            INSERT INTO conversations (
                id, account_number, player_id, player_username,
                started_at, last_message_at, topic, sentiment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT(id) DO UPDATE SET
                last_message_at = MAX(conversations.last_message_at, excluded.last_message_at),
                player_id = COALESCE(conversations.player_id, excluded.player_id),
                player_username = COALESCE(conversations.player_username, excluded.player_username),
                topic = COALESCE(conversations.topic, excluded.topic),
                sentiment = COALESCE(conversations.sentiment, excluded.sentiment)
            WHERE conversations.account_number = excluded.account_number
            ",
        )
        .bind(&exchange.conversation_id)
        .bind(exchange.account_number.get())
        .bind(exchange.player_id.as_deref())
        .bind(exchange.player_username.as_deref())
        .bind(&started_at)
        .bind(&last_message_at)
        .bind(classification.normalized_topic())
        .bind(classification.sentiment.map(|s| s.as_str()))
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::OwnershipConflict {
                entity: "conversation",
                id: exchange.conversation_id.clone(),
            });
        }
        Ok(())
    }

    async fn insert_message(
        tx: &mut Transaction<'_, Sqlite>,
        exchange: &Exchange,
        sender: SenderRole,
        content: &[u8],
        is_troll: bool,
        created_at: &str,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, sender, content_encrypted, created_at, is_troll, source_client)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&id)
        .bind(&exchange.conversation_id)
        .bind(sender.as_str())
        .bind(content)
        .bind(created_at)
        .bind(is_troll)
        .bind(exchange.source_client.as_deref())
        .execute(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn insert_analytics(
        tx: &mut Transaction<'_, Sqlite>,
        exchange: &Exchange,
        player_id: &str,
        country: &str,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r"
            INSERT INTO analytics (id, player_id, account_number, country, inferred_age_range, source_client, created_at)
            VALUES ($1, $2, $3, $4, NULL, $5, $6)
            ",
        )
        .bind(&id)
        .bind(player_id)
        .bind(exchange.account_number.get())
        .bind(country)
        .bind(exchange.source_client.as_deref())
        .bind(format_timestamp(&exchange.received_at))
        .execute(&mut **tx)
        .await?;
        Ok(id)
    }

    /// Get a conversation by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, DatabaseError> {
        let row = sqlx::query(
            r"
            SELECT id, account_number, player_id, player_username, started_at, last_message_at, topic, sentiment
            FROM conversations
            WHERE id = $1
            ",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ConversationRecord {
            id: r.get("id"),
            account_number: r.get("account_number"),
            player_id: r.get("player_id"),
            player_username: r.get("player_username"),
            started_at: r.get("started_at"),
            last_message_at: r.get("last_message_at"),
            topic: r.get("topic"),
            sentiment: r.get("sentiment"),
        }))
    }

    /// Messages of a conversation in write order, content decrypted
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or content cannot be decrypted
    pub async fn get_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, sender, content_encrypted, created_at, is_troll, source_client
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let sender: String = r.get("sender");
                let encrypted: Vec<u8> = r.get("content_encrypted");
                Ok(MessageRecord {
                    id: r.get("id"),
                    conversation_id: r.get("conversation_id"),
                    sender: SenderRole::from_label(&sender).ok_or_else(|| {
                        DatabaseError::InvalidData(format!("unknown sender: {sender}"))
                    })?,
                    content: self.cipher.decrypt(&encrypted)?,
                    created_at: r.get("created_at"),
                    is_troll: r.get("is_troll"),
                    source_client: r.get("source_client"),
                })
            })
            .collect()
    }

    /// Analytics rows recorded for a tenant, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_analytics(
        &self,
        account: AccountNumber,
    ) -> Result<Vec<AnalyticsRecord>, DatabaseError> {
        let rows = sqlx::query(
            r"
            SELECT id, player_id, account_number, country, inferred_age_range, source_client, created_at
            FROM analytics
            WHERE account_number = $1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(account.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| AnalyticsRecord {
                id: r.get("id"),
                player_id: r.get("player_id"),
                account_number: r.get("account_number"),
                country: r.get("country"),
                inferred_age_range: r.get("inferred_age_range"),
                source_client: r.get("source_client"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
