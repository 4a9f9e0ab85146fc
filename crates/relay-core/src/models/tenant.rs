// ABOUTME: Tenant identity and per-tenant relay settings
// ABOUTME: AccountNumber newtype and TenantSettings with source allow-list helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Type-safe wrapper for tenant account numbers
///
/// Account numbers are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AccountNumber(i64);

/// Rejected account number value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("account number must be a positive integer")]
pub struct InvalidAccountNumber;

impl AccountNumber {
    /// Create an `AccountNumber`, rejecting zero and negative values
    pub const fn new(value: i64) -> Result<Self, InvalidAccountNumber> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(InvalidAccountNumber)
        }
    }

    /// Get the inner integer value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for AccountNumber {
    type Error = InvalidAccountNumber;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountNumber> for i64 {
    fn from(account: AccountNumber) -> Self {
        account.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = InvalidAccountNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map_err(|_| InvalidAccountNumber)
            .and_then(Self::new)
    }
}

/// Relay settings owned by one tenant
///
/// Read-only from the relay's point of view apart from the lazy
/// API key backfill performed by the tenant directory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    /// Owning tenant
    pub account_number: AccountNumber,
    /// Optional system prompt prepended to every user message
    pub system_prompt: Option<String>,
    /// Allowed source-client labels; empty means unrestricted
    pub sources: Vec<String>,
    /// Secret key presented in `x-api-key`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl TenantSettings {
    /// Settings with no prompt, no source restriction, and no key
    #[must_use]
    pub const fn empty(account_number: AccountNumber) -> Self {
        Self {
            account_number,
            system_prompt: None,
            sources: Vec::new(),
            api_key: None,
        }
    }

    /// Decode the stored JSON source list
    ///
    /// Entries are trimmed and blanks dropped. Anything that is not a JSON
    /// array of strings is treated as "no restriction".
    #[must_use]
    pub fn sources_from_json(raw: Option<&str>) -> Vec<String> {
        raw.and_then(|json| serde_json::from_str::<Vec<serde_json::Value>>(json).ok())
            .map(|values| {
                Self::normalize_sources(
                    values
                        .iter()
                        .filter_map(serde_json::Value::as_str)
                        .map(ToOwned::to_owned),
                )
            })
            .unwrap_or_default()
    }

    /// Trim source labels and drop blank ones
    pub fn normalize_sources(sources: impl IntoIterator<Item = String>) -> Vec<String> {
        sources
            .into_iter()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Encode the source list for storage
    #[must_use]
    pub fn sources_to_json(&self) -> String {
        serde_json::Value::from(self.sources.clone()).to_string()
    }

    /// System prompt, if one is configured and not blank
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }

    /// Configured secret key, if any
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Whether the allow-list restricts source clients
    #[must_use]
    pub fn restricts_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// First allowed source, adopted when a request declares none
    #[must_use]
    pub fn default_source(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }

    /// Whether `source` may be declared by a caller
    #[must_use]
    pub fn permits_source(&self, source: &str) -> bool {
        !self.restricts_sources() || self.sources.iter().any(|allowed| allowed == source)
    }
}

impl fmt::Debug for TenantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantSettings")
            .field("account_number", &self.account_number)
            .field("system_prompt", &self.system_prompt)
            .field("sources", &self.sources)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(n: i64) -> AccountNumber {
        AccountNumber::new(n).unwrap()
    }

    #[test]
    fn test_account_number_rejects_non_positive() {
        assert!(AccountNumber::new(0).is_err());
        assert!(AccountNumber::new(-4).is_err());
        assert_eq!(account(7).get(), 7);
        assert_eq!("  42 ".parse::<AccountNumber>().unwrap().get(), 42);
        assert!("abc".parse::<AccountNumber>().is_err());
    }

    #[test]
    fn test_sources_from_json_trims_and_filters() {
        let sources = TenantSettings::sources_from_json(Some(r#"[" web ", "", "app", 3]"#));
        assert_eq!(sources, vec!["web".to_owned(), "app".to_owned()]);
        assert!(TenantSettings::sources_from_json(Some("not json")).is_empty());
        assert!(TenantSettings::sources_from_json(None).is_empty());
    }

    #[test]
    fn test_source_allow_list() {
        let mut settings = TenantSettings::empty(account(1));
        assert!(settings.permits_source("anything"));
        assert_eq!(settings.default_source(), None);

        settings.sources = vec!["web".into(), "kiosk".into()];
        assert!(settings.permits_source("kiosk"));
        assert!(!settings.permits_source("mobile"));
        assert_eq!(settings.default_source(), Some("web"));
    }

    #[test]
    fn test_blank_prompt_is_ignored() {
        let mut settings = TenantSettings::empty(account(1));
        settings.system_prompt = Some("   ".into());
        assert_eq!(settings.system_prompt(), None);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut settings = TenantSettings::empty(account(1));
        settings.api_key = Some("ck_supersecret".into());
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
