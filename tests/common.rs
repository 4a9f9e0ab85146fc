// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory resources, stub LLM providers with call counts, and tenant seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `chat_relay`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use async_trait::async_trait;
use axum::Router;
use chat_relay::{
    config::{
        DatabaseUrl, EncryptionConfig, Environment, GeminiConfig, RateLimitConfig, ServerConfig,
    },
    crypto::ContentCipher,
    database::{ConversationStore, Database},
    llm::{ChatRequest, ChatResponse, LlmError, LlmProvider},
    models::{AccountNumber, TenantSettings},
    resources::ServerResources,
    server::build_router,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT_LOGGER: Once = Once::new();

/// Passphrase used for message encryption in tests
pub const TEST_ENCRYPTION_KEY: &str = "test-message-encryption-key";

/// Classifier output used unless a test overrides it
pub const DEFAULT_CLASSIFICATION: &str =
    r#"{"topic":"greetings","sentiment":"positive","troll":false}"#;

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // Check for TEST_LOG environment variable to control test logging level
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// What a stub provider does when called
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Answer with this text
    Reply(String),
    /// Answer with this text after a delay
    DelayedReply(Duration, String),
    /// Fail as if the backend returned 500
    Fail,
}

/// LLM provider double that records every request
#[derive(Debug)]
pub struct StubProvider {
    behavior: StubBehavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StubProvider {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(StubBehavior::Reply(text.to_owned()))
    }

    pub fn failing() -> Self {
        Self::new(StubBehavior::Fail)
    }

    /// Number of `complete` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Concatenated user text of every request, in call order
    pub fn user_texts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(ChatRequest::user_text)
            .collect()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let text = match &self.behavior {
            StubBehavior::Reply(text) => text.clone(),
            StubBehavior::DelayedReply(delay, text) => {
                tokio::time::sleep(*delay).await;
                text.clone()
            }
            StubBehavior::Fail => {
                return Err(LlmError::Status {
                    status: 500,
                    message: "backend unavailable".to_owned(),
                })
            }
        };

        Ok(ChatResponse {
            content: text,
            model: "stub-model".to_owned(),
            usage: None,
            finish_reason: Some("STOP".to_owned()),
        })
    }
}

/// Configuration pointing at an in-memory database and unused Gemini settings
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        host: "127.0.0.1".to_owned(),
        environment: Environment::Testing,
        database_url: DatabaseUrl::Memory,
        gemini: GeminiConfig {
            api_key: "test-gemini-key".to_owned(),
            model: "stub-model".to_owned(),
            classifier_model: "stub-model".to_owned(),
            base_url: "http://127.0.0.1:9".to_owned(),
            timeout: Duration::from_secs(5),
        },
        encryption: EncryptionConfig {
            message_key: TEST_ENCRYPTION_KEY.to_owned(),
        },
        rate_limit: RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 1_000,
        },
    }
}

/// In-memory server resources plus handles on the stub providers
pub struct TestContext {
    pub resources: Arc<ServerResources>,
    pub generator: Arc<StubProvider>,
    pub classifier: Arc<StubProvider>,
}

impl TestContext {
    /// Generator replies "Ahoy!", classifier returns a valid document
    pub async fn new() -> Self {
        Self::with_providers(
            StubProvider::replying("Ahoy!"),
            StubProvider::replying(DEFAULT_CLASSIFICATION),
        )
        .await
    }

    pub async fn with_providers(generator: StubProvider, classifier: StubProvider) -> Self {
        Self::build(test_config(), generator, classifier).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        Self::build(
            config,
            StubProvider::replying("Ahoy!"),
            StubProvider::replying(DEFAULT_CLASSIFICATION),
        )
        .await
    }

    async fn build(config: ServerConfig, generator: StubProvider, classifier: StubProvider) -> Self {
        init_test_logging();
        let database = Database::new(&config.database_url).await.unwrap();
        let generator = Arc::new(generator);
        let classifier = Arc::new(classifier);
        let resources = Arc::new(ServerResources::new(
            Arc::new(config),
            database,
            Arc::clone(&generator) as Arc<dyn LlmProvider>,
            Arc::clone(&classifier) as Arc<dyn LlmProvider>,
        ));
        Self {
            resources,
            generator,
            classifier,
        }
    }

    /// Full application router
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.resources))
    }

    /// Store a tenant and return its API key
    pub async fn seed_tenant(&self, account: i64, prompt: Option<&str>, sources: &[&str]) -> String {
        let settings = TenantSettings {
            account_number: AccountNumber::new(account).unwrap(),
            system_prompt: prompt.map(ToOwned::to_owned),
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
            api_key: None,
        };
        let stored = self
            .resources
            .database
            .tenants()
            .upsert_settings(&settings)
            .await
            .unwrap();
        stored.api_key().unwrap().to_owned()
    }

    /// Reader over the same database and key as the recorder
    pub fn store(&self) -> ConversationStore {
        self.resources
            .database
            .conversations(ContentCipher::from_passphrase(TEST_ENCRYPTION_KEY))
    }

    /// Wait until every detached generation and persistence unit has finished
    pub async fn wait_for_background(&self) {
        self.resources.tracker.close();
        self.resources.tracker.wait().await;
        self.resources.tracker.reopen();
    }
}
