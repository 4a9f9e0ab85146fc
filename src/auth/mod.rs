// ABOUTME: Authorization gate validating the tenant key and the declared source client
// ABOUTME: Runs to completion before any generation call; adopts the tenant's default source
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Authorization Gate
//!
//! A request is authorized when its `x-api-key` exactly matches the key
//! stored for the declared tenant. An unknown tenant, a tenant without a key,
//! a missing header, and a wrong key are indistinguishable to the caller.
//!
//! When the tenant has a non-empty source allow-list, a declared source must
//! be on it. A request that declares no source adopts the first allowed one.

use crate::crypto::constant_time_eq;
use crate::database::TenantDirectory;
use relay_core::errors::{AppError, DatabaseError};
use relay_core::models::{AccountNumber, TenantSettings};
use thiserror::Error;
use tracing::{instrument, warn};

/// Reasons a request fails authorization
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, unknown, or mismatched key
    #[error("unauthorized")]
    Unauthorized,
    /// Declared source is not on the tenant's allow-list
    #[error("source client not allowed")]
    InvalidSource,
    /// The tenant directory could not be read
    #[error("tenant lookup failed: {0}")]
    Directory(#[from] DatabaseError),
}

impl AuthError {
    /// Convert to the HTTP error, naming the request field that carried the source
    #[must_use]
    pub fn into_app_error(self, source_field: &str) -> AppError {
        match self {
            Self::Unauthorized => AppError::unauthorized(),
            Self::InvalidSource => AppError::invalid_source(source_field),
            Self::Directory(e) => AppError::from(e),
        }
    }
}

/// Outcome of a successful authorization
#[derive(Debug, Clone)]
pub struct AuthorizedTenant {
    /// The tenant's settings as read for this request
    pub settings: TenantSettings,
    /// Declared source, or the tenant's default when none was declared
    pub source_client: Option<String>,
}

/// Validates tenant credentials against the tenant directory
#[derive(Clone)]
pub struct AuthorizationGate {
    tenants: TenantDirectory,
}

impl AuthorizationGate {
    /// Create a new gate backed by `tenants`
    #[must_use]
    pub const fn new(tenants: TenantDirectory) -> Self {
        Self { tenants }
    }

    /// Authorize a request for `account`
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for any key problem, `InvalidSource` for a
    /// declared source outside a non-empty allow-list, and `Directory` when
    /// the tenant record cannot be read
    #[instrument(skip(self, presented_key), fields(account_number = %account))]
    pub async fn authorize(
        &self,
        account: AccountNumber,
        presented_key: Option<&str>,
        declared_source: Option<&str>,
    ) -> Result<AuthorizedTenant, AuthError> {
        let settings = self.tenants.get_settings(account).await?;
        let presented_key = presented_key.filter(|key| !key.is_empty());

        let expected_key = settings.as_ref().and_then(TenantSettings::api_key);
        let has_expected_key = expected_key.is_some();
        let key_matches = match (presented_key, expected_key) {
            (Some(presented), Some(expected)) => constant_time_eq(presented, expected),
            _ => false,
        };

        let settings = match settings {
            Some(settings) if key_matches => settings,
            _ => {
                warn!(
                    has_api_key_header = presented_key.is_some(),
                    has_expected_key,
                    "Unauthorized request"
                );
                return Err(AuthError::Unauthorized);
            }
        };

        let source_client = Self::resolve_source(&settings, declared_source)?;
        Ok(AuthorizedTenant {
            settings,
            source_client,
        })
    }

    /// Check a declared source against the allow-list, or adopt the default
    fn resolve_source(
        settings: &TenantSettings,
        declared_source: Option<&str>,
    ) -> Result<Option<String>, AuthError> {
        match declared_source.map(str::trim).filter(|s| !s.is_empty()) {
            Some(source) if settings.permits_source(source) => Ok(Some(source.to_owned())),
            Some(source) => {
                warn!(
                    source_client = %source,
                    allowed_sources = ?settings.sources,
                    "Source client not allowed"
                );
                Err(AuthError::InvalidSource)
            }
            None => Ok(settings.default_source().map(ToOwned::to_owned)),
        }
    }
}
