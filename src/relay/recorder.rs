// ABOUTME: Detached enrichment-then-persist unit scheduled after a reply is delivered
// ABOUTME: Tracked on a TaskTracker so shutdown can drain it; failures only reach the log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::database::ConversationStore;
use crate::enrichment::Enricher;
use relay_core::models::Exchange;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, Instrument};

/// Schedules classification and persistence of completed exchanges
///
/// Work is spawned on the runtime captured at construction, so it can be
/// scheduled from `Drop` impls and is independent of the request task.
#[derive(Clone)]
pub struct ExchangeRecorder {
    enricher: Enricher,
    store: ConversationStore,
    tracker: TaskTracker,
    handle: Handle,
}

impl ExchangeRecorder {
    /// Create a recorder bound to the current runtime
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(enricher: Enricher, store: ConversationStore, tracker: TaskTracker) -> Self {
        Self {
            enricher,
            store,
            tracker,
            handle: Handle::current(),
        }
    }

    /// Tracker owning every detached unit
    #[must_use]
    pub const fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Classify and persist `exchange` without awaiting the result
    pub fn record(&self, exchange: Exchange) {
        let recorder = self.clone();
        let span = tracing::info_span!(
            "record_exchange",
            conversation_id = %exchange.conversation_id,
            account_number = %exchange.account_number,
        );
        self.tracker.spawn_on(
            async move { recorder.record_now(&exchange).await }.instrument(span),
            &self.handle,
        );
    }

    /// Classify and persist `exchange`, logging the outcome
    pub async fn record_now(&self, exchange: &Exchange) {
        let classification = self.enricher.classify(&exchange.user_message).await;
        match self.store.persist_exchange(exchange, &classification).await {
            Ok(persisted) => info!(
                user_message_id = %persisted.user_message_id,
                analytics = persisted.analytics_id.is_some(),
                "Exchange recorded"
            ),
            Err(e) => error!(error = %e, "Failed to persist exchange"),
        }
    }
}

/// Records its exchange exactly once, when dropped
///
/// Owned by the response stream: it drops after the final event has been
/// handed to the connection, or earlier if the client goes away.
pub struct RecordOnDrop {
    recorder: ExchangeRecorder,
    exchange: Option<Exchange>,
}

impl RecordOnDrop {
    /// Arm a guard for `exchange`
    #[must_use]
    pub fn new(recorder: ExchangeRecorder, exchange: Exchange) -> Self {
        Self {
            recorder,
            exchange: Some(exchange),
        }
    }
}

impl Drop for RecordOnDrop {
    fn drop(&mut self) {
        if let Some(exchange) = self.exchange.take() {
            self.recorder.record(exchange);
        }
    }
}
