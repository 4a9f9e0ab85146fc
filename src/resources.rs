// ABOUTME: Shared server resources handed to every route as axum state
// ABOUTME: Wires the database, authorization gate, relay, recorder, and rate limiter once at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::auth::AuthorizationGate;
use crate::config::ServerConfig;
use crate::crypto::ContentCipher;
use crate::database::{Database, RecommendationManager};
use crate::enrichment::Enricher;
use crate::llm::{GeminiProvider, LlmProvider};
use crate::middleware::RateLimiter;
use crate::relay::{ExchangeRecorder, Relay};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Centralized resource container for dependency injection
///
/// Built once and shared as `Arc<ServerResources>`. Everything inside is
/// cheap to clone or already reference counted.
#[derive(Clone)]
pub struct ServerResources {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Connection pool owner
    pub database: Database,
    /// Tenant key and source checks
    pub gate: AuthorizationGate,
    /// Generation plus persistence hand-off
    pub relay: Relay,
    /// Recommendation inserts
    pub recommendations: RecommendationManager,
    /// Chat route limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// Tracks detached generation and persistence work
    pub tracker: TaskTracker,
}

impl ServerResources {
    /// Assemble resources around explicit generation and classification providers
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        database: Database,
        generator: Arc<dyn LlmProvider>,
        classifier: Arc<dyn LlmProvider>,
    ) -> Self {
        let tracker = TaskTracker::new();
        let cipher = ContentCipher::from_passphrase(&config.encryption.message_key);
        let enricher = Enricher::new(classifier).with_model(config.gemini.classifier_model.clone());
        let recorder = ExchangeRecorder::new(
            enricher,
            database.conversations(cipher),
            tracker.clone(),
        );
        let relay = Relay::new(generator, recorder).with_model(config.gemini.model.clone());

        Self {
            gate: AuthorizationGate::new(database.tenants()),
            recommendations: database.recommendations(),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            relay,
            tracker,
            database,
            config,
        }
    }

    /// Connect to the configured database and the Gemini backend
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated
    pub async fn from_config(config: ServerConfig) -> Result<Self> {
        let database = Database::new(&config.database_url).await?;
        let generator: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::from_config(&config.gemini));
        let classifier: Arc<dyn LlmProvider> = Arc::new(
            GeminiProvider::from_config(&config.gemini)
                .with_default_model(config.gemini.classifier_model.clone()),
        );
        Ok(Self::new(Arc::new(config), database, generator, classifier))
    }

    /// Recorder receiving completed exchanges
    #[must_use]
    pub const fn recorder(&self) -> &ExchangeRecorder {
        self.relay.recorder()
    }

    /// Wait for every detached unit to finish, then close the pool
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.database.close().await;
    }
}
