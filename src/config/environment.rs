// ABOUTME: Environment-based configuration management for the relay server
// ABOUTME: Parses ports, database URL, Gemini settings, encryption key, and rate limits from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default HTTP listen port
pub const DEFAULT_HTTP_PORT: u16 = 8081;
/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/chat_relay.db";
/// Default generation model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Default Gemini API base URL
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default timeout for generation and classifier calls
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
/// Default chat rate-limit window
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
/// Default chat requests allowed per window per client
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 30;
/// Minimum accepted length of the message encryption passphrase
pub const MIN_ENCRYPTION_KEY_CHARS: usize = 16;

/// Environment type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database file
    SQLite {
        /// File path
        path: PathBuf,
    },
    /// In-memory SQLite (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string
    ///
    /// Accepts `sqlite:<path>`, `sqlite://<path>`, `sqlite::memory:`, or a bare path.
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s
            .strip_prefix("sqlite://")
            .or_else(|| s.strip_prefix("sqlite:"))
            .unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Convert to an sqlx connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(DEFAULT_DATABASE_URL)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Generation backend settings
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header
    pub api_key: String,
    /// Model used for replies
    pub model: String,
    /// Model used for classification
    pub classifier_model: String,
    /// API base URL
    pub base_url: String,
    /// Per-call timeout
    pub timeout: Duration,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("classifier_model", &self.classifier_model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Message encryption settings
#[derive(Clone)]
pub struct EncryptionConfig {
    /// Passphrase from which the content key is derived
    pub message_key: String,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("message_key", &"[REDACTED]")
            .finish()
    }
}

/// Fixed-window rate limit for chat routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Requests allowed per client per window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            max_requests: DEFAULT_RATE_LIMIT_MAX,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Bind address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Database location
    pub database_url: DatabaseUrl,
    /// Generation backend
    pub gemini: GeminiConfig,
    /// Message encryption
    pub encryption: EncryptionConfig,
    /// Chat rate limit
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a required value is
    /// missing or a value cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let gemini_model = env_var_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL);
        let config = Self {
            http_port: parse_first(&["HTTP_PORT", "PORT"], DEFAULT_HTTP_PORT)?,
            host: env_var_or("HOST", DEFAULT_HOST),
            environment: Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development")),
            database_url: DatabaseUrl::parse_url(
                &first_env(&["DATABASE_URL", "DB_URL"])
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            ),
            gemini: GeminiConfig {
                api_key: first_env(&["GEMINI_API_KEY", "GEMINI_KEY"])
                    .context("GEMINI_API_KEY (or GEMINI_KEY) must be set")?,
                classifier_model: env_var_or("CLASSIFIER_MODEL", &gemini_model),
                model: gemini_model,
                base_url: env_var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                timeout: Duration::from_secs(parse_first(
                    &["UPSTREAM_TIMEOUT_SECS"],
                    DEFAULT_UPSTREAM_TIMEOUT_SECS,
                )?),
            },
            encryption: EncryptionConfig {
                message_key: first_env(&["MESSAGE_ENCRYPTION_KEY"])
                    .context("MESSAGE_ENCRYPTION_KEY must be set")?,
            },
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(parse_first(
                    &["CHAT_RATE_LIMIT_WINDOW_MS"],
                    DEFAULT_RATE_LIMIT_WINDOW_MS,
                )?),
                max_requests: parse_first(&["CHAT_RATE_LIMIT_MAX"], DEFAULT_RATE_LIMIT_MAX)?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY must not be empty");
        }
        if self.encryption.message_key.chars().count() < MIN_ENCRYPTION_KEY_CHARS {
            bail!("MESSAGE_ENCRYPTION_KEY must be at least {MIN_ENCRYPTION_KEY_CHARS} characters");
        }
        if self.gemini.timeout.is_zero() {
            bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }
        if self.rate_limit.window.is_zero() || self.rate_limit.max_requests == 0 {
            bail!("CHAT_RATE_LIMIT_WINDOW_MS and CHAT_RATE_LIMIT_MAX must be greater than zero");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Chat Relay Configuration:\n\
             - Bind: {}:{}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Generation Model: {}\n\
             - Classifier Model: {}\n\
             - Upstream Timeout: {}s\n\
             - Chat Rate Limit: {} per {}ms",
            self.host,
            self.http_port,
            self.environment,
            self.database_url,
            self.gemini.model,
            self.gemini.classifier_model,
            self.gemini.timeout.as_secs(),
            self.rate_limit.max_requests,
            self.rate_limit.window.as_millis(),
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// First non-blank value among `keys`
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

/// Parse the first set variable among `keys`, or fall back to `default`
fn parse_first<T>(keys: &[&str], default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    for key in keys {
        if let Ok(raw) = env::var(key) {
            if raw.trim().is_empty() {
                continue;
            }
            return raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {key} value: {raw}"));
        }
    }
    Ok(default)
}
