// ABOUTME: Relay of one authorized chat turn to the generation backend
// ABOUTME: Blocking generation, fixed SSE framing, and hand-off to detached persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Relay
//!
//! A turn is relayed in three steps:
//!
//! 1. [`compose_prompt`] prefixes the tenant prompt, if any, to the message.
//! 2. [`Relay::generate`] makes exactly one call to the generation backend
//!    and waits for the complete reply. Nothing is written to the client
//!    until it returns.
//! 3. [`stream_exchange`] emits `meta`, `token`, `done` and schedules
//!    enrichment plus persistence once the stream is finished.
//!
//! The generation call runs on a tracked task of its own. If the client
//! disconnects while it is in flight, the call still completes and the
//! exchange is recorded.

pub mod prompt;
pub mod recorder;
mod stream;

pub use prompt::compose_prompt;
pub use recorder::{ExchangeRecorder, RecordOnDrop};
pub use stream::{build_events, stream_exchange, EVENT_DONE, EVENT_META, EVENT_TOKEN};

use crate::llm::{ChatMessage, ChatRequest, LlmError, LlmProvider};
use chrono::{DateTime, Utc};
use relay_core::models::{AccountNumber, Exchange};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn, Instrument};

/// A validated, authorized turn awaiting its reply
#[derive(Debug, Clone)]
pub struct RelayTurn {
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
    pub message: String,
    /// When the request was received
    pub received_at: DateTime<Utc>,
}

impl RelayTurn {
    /// Pair the turn with its reply
    #[must_use]
    pub fn into_exchange(self, reply: String, replied_at: DateTime<Utc>) -> Exchange {
        Exchange {
            conversation_id: self.conversation_id,
            account_number: self.account_number,
            player_id: self.player_id,
            player_username: self.player_username,
            source_client: self.source_client,
            country: self.country,
            user_message: self.message,
            assistant_reply: reply,
            received_at: self.received_at,
            replied_at,
        }
    }
}

/// Issues generation calls and owns the persistence hand-off
#[derive(Clone)]
pub struct Relay {
    generator: Arc<dyn LlmProvider>,
    model: Option<String>,
    recorder: ExchangeRecorder,
}

impl Relay {
    /// Create a relay using the generator's default model
    #[must_use]
    pub fn new(generator: Arc<dyn LlmProvider>, recorder: ExchangeRecorder) -> Self {
        Self {
            generator,
            model: None,
            recorder,
        }
    }

    /// Use a specific generation model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Recorder receiving completed exchanges
    #[must_use]
    pub const fn recorder(&self) -> &ExchangeRecorder {
        &self.recorder
    }

    /// Generate the reply for `turn`
    ///
    /// Exactly one backend call is made. When the caller stops waiting
    /// before it returns, a successful exchange is recorded by the
    /// generation task itself.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, or `Request` if the generation task was
    /// cancelled
    pub async fn generate(
        &self,
        turn: RelayTurn,
        system_prompt: Option<&str>,
    ) -> Result<Exchange, LlmError> {
        let mut request = ChatRequest::new(vec![ChatMessage::user(compose_prompt(
            system_prompt,
            &turn.message,
        ))]);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let (sender, receiver) = oneshot::channel();
        let generator = Arc::clone(&self.generator);
        let recorder = self.recorder.clone();
        let span = tracing::info_span!(
            "generate_reply",
            conversation_id = %turn.conversation_id,
            account_number = %turn.account_number,
        );

        self.recorder.tracker().spawn(
            async move {
                let outcome = generator
                    .complete(&request)
                    .await
                    .map(|response| turn.into_exchange(response.content, Utc::now()));

                if let Err(unclaimed) = sender.send(outcome) {
                    if let Ok(exchange) = unclaimed {
                        info!("Client went away before the reply, recording anyway");
                        recorder.record(exchange);
                    }
                }
            }
            .instrument(span),
        );

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Generation task ended without a result");
                Err(LlmError::Request("generation task cancelled".into()))
            }
        }
    }
}
