// ABOUTME: Request body parsing and field-level validation shared by the JSON routes
// ABOUTME: Collects issues as {path, message} entries rendered under "details" on a 400
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One problem found in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path from the body root; empty for whole-body problems
    pub path: Vec<String>,
    /// Human-readable description
    pub message: String,
}

impl ValidationIssue {
    /// Issue at `path`
    pub fn new(path: &[&str], message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|p| (*p).to_owned()).collect(),
            message: message.into(),
        }
    }
}

/// Accumulates issues while a body is checked field by field
#[derive(Debug, Default)]
pub struct Issues(Vec<ValidationIssue>);

impl Issues {
    /// Record an issue at `path`
    pub fn push(&mut self, path: &[&str], message: impl Into<String>) {
        self.0.push(ValidationIssue::new(path, message));
    }

    /// Fail with every recorded issue, or succeed with `value` if there are none
    ///
    /// # Errors
    ///
    /// Returns a validation error carrying all recorded issues
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(validation_error(self.0))
        }
    }

    /// Fail with every recorded issue
    ///
    /// Used once a required value is known to be missing, which has already
    /// been recorded.
    #[must_use]
    pub fn into_error(self) -> AppError {
        validation_error(self.0)
    }

    /// Require a present value, recording `Required` otherwise
    pub fn required<T>(&mut self, path: &[&str], value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(path, "Required");
        }
        value
    }

    /// Check a string's length in characters against `min..=max`
    pub fn check_length(&mut self, path: &[&str], value: &str, min: usize, max: usize) {
        let chars = value.chars().count();
        if chars < min {
            self.push(path, format!("Must contain at least {min} character(s)"));
        } else if chars > max {
            self.push(path, format!("Must contain at most {max} character(s)"));
        }
    }
}

fn validation_error(issues: Vec<ValidationIssue>) -> AppError {
    AppError::validation(serde_json::to_value(issues).unwrap_or_default())
}

/// Decode a JSON body into `T`
///
/// Malformed JSON and type mismatches are reported as a single issue with
/// the parser's message.
///
/// # Errors
///
/// Returns a validation error when the body cannot be decoded
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| validation_error(vec![ValidationIssue::new(&[], e.to_string())]))
}
