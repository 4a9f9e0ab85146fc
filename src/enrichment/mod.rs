// ABOUTME: Best-effort classification of a user message into topic, sentiment, and troll flag
// ABOUTME: Any failure is logged and replaced by the neutral fallback; errors never escape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Enrichment
//!
//! [`Enricher::classify`] asks the classifier model for a JSON document of
//! the exact shape `{"topic": string|null, "sentiment": "positive"|"neutral"|"negative"|null, "troll": bool}`.
//! Transport failures, non-success statuses, unparsable output, and schema
//! violations all collapse into [`Classification::fallback`].

use crate::llm::{ChatMessage, ChatRequest, LlmError, LlmProvider};
use relay_core::models::{Classification, Sentiment};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Instruction sent with every classification request
const CLASSIFIER_INSTRUCTION: &str = "You classify a single chat message written by a player. \
Respond with only a JSON object of the form \
{\"topic\": string or null, \"sentiment\": \"positive\" | \"neutral\" | \"negative\" or null, \"troll\": boolean}. \
topic is a short lowercase label (one to three words) for what the message is about. \
troll is true when the message is abusive, spam, or deliberately disruptive. \
Do not include any other keys or any text outside the JSON object.";

/// Output budget for the classifier; the document is tiny
const CLASSIFIER_MAX_TOKENS: u32 = 256;

/// Why a classification attempt failed
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The classifier call itself failed
    #[error("classifier request failed: {0}")]
    Request(#[from] LlmError),
    /// The output was not JSON
    #[error("classifier output is not JSON: {0}")]
    Parse(String),
    /// The JSON did not match the expected shape
    #[error("classifier output violates schema: {0}")]
    Schema(String),
}

/// Wire shape of the classifier output; every key is required
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassification {
    #[serde(deserialize_with = "Option::deserialize")]
    topic: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    sentiment: Option<Sentiment>,
    troll: bool,
}

/// Classifies user messages through an LLM provider
#[derive(Clone)]
pub struct Enricher {
    classifier: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl Enricher {
    /// Create an enricher using the provider's default model
    #[must_use]
    pub fn new(classifier: Arc<dyn LlmProvider>) -> Self {
        Self {
            classifier,
            model: None,
        }
    }

    /// Use a specific classifier model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Classify `message`, falling back to neutral values on any failure
    #[instrument(skip_all, fields(chars = message.chars().count()))]
    pub async fn classify(&self, message: &str) -> Classification {
        match self.try_classify(message).await {
            Ok(classification) => {
                debug!(
                    topic = classification.topic.as_deref().unwrap_or(""),
                    troll = classification.troll,
                    "Message classified"
                );
                classification
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, using fallback");
                Classification::fallback()
            }
        }
    }

    async fn try_classify(&self, message: &str) -> Result<Classification, EnrichmentError> {
        let mut request = ChatRequest::new(vec![
            ChatMessage::system(CLASSIFIER_INSTRUCTION),
            ChatMessage::user(message),
        ])
        .with_temperature(0.0)
        .with_max_tokens(CLASSIFIER_MAX_TOKENS)
        .with_json_output();
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let response = self.classifier.complete(&request).await?;
        parse_classification(&response.content)
    }
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop an info string such as `json` on the opening fence line
    inner
        .split_once('\n')
        .map_or(inner, |(first, rest)| {
            if first.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
                rest
            } else {
                inner
            }
        })
        .trim()
}

/// Parse and validate classifier output
///
/// # Errors
///
/// Returns `Parse` when the text is not JSON and `Schema` when the JSON does
/// not have exactly the expected keys and value types
pub fn parse_classification(raw: &str) -> Result<Classification, EnrichmentError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| EnrichmentError::Parse(e.to_string()))?;
    let parsed: RawClassification =
        serde_json::from_value(value).map_err(|e| EnrichmentError::Schema(e.to_string()))?;

    Ok(Classification {
        topic: parsed.topic,
        sentiment: parsed.sentiment,
        troll: parsed.troll,
    })
}
