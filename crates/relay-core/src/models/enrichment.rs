// ABOUTME: Classification result produced by the enrichment step
// ABOUTME: Sentiment labels, neutral fallback values, and topic normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::relay::FALLBACK_TOPIC;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sentiment label assigned to a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Positive tone
    Positive,
    /// Neutral tone
    Neutral,
    /// Negative tone
    Negative,
}

/// Unrecognized sentiment label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sentiment label: {0}")]
pub struct UnknownSentiment(pub String);

impl Sentiment {
    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(UnknownSentiment(other.to_owned())),
        }
    }
}

/// Topic, sentiment, and abuse signal for one user message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Free-text topic label
    pub topic: Option<String>,
    /// Sentiment label
    pub sentiment: Option<Sentiment>,
    /// Abuse/troll signal
    pub troll: bool,
}

impl Classification {
    /// Neutral result used whenever classification fails
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            topic: None,
            sentiment: None,
            troll: false,
        }
    }

    /// Topic as stored: trimmed, with blanks replaced by the fallback topic
    #[must_use]
    pub fn normalized_topic(&self) -> String {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .unwrap_or(FALLBACK_TOPIC)
            .to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_neutral() {
        let fallback = Classification::fallback();
        assert_eq!(fallback.topic, None);
        assert_eq!(fallback.sentiment, None);
        assert!(!fallback.troll);
        assert_eq!(fallback.normalized_topic(), "general");
    }

    #[test]
    fn test_blank_topic_normalizes_to_general() {
        let classification = Classification {
            topic: Some("   ".into()),
            ..Classification::fallback()
        };
        assert_eq!(classification.normalized_topic(), "general");
    }

    #[test]
    fn test_topic_is_trimmed() {
        let classification = Classification {
            topic: Some("  billing ".into()),
            ..Classification::fallback()
        };
        assert_eq!(classification.normalized_topic(), "billing");
    }

    #[test]
    fn test_sentiment_round_trips_through_label() {
        assert_eq!("negative".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert_eq!(Sentiment::Positive.as_str(), "positive");
        assert!("angry".parse::<Sentiment>().is_err());
    }
}
