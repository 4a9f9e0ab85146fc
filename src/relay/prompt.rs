// ABOUTME: Composition of the single-turn prompt forwarded to the generation backend
// ABOUTME: Prepends the tenant system prompt with a role marker when one is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Marker separating the tenant prompt from the user's message
pub const USER_ROLE_MARKER: &str = "User: ";

/// Build the text sent to the generation backend
///
/// Without a (non-blank) system prompt the message is forwarded verbatim.
#[must_use]
pub fn compose_prompt(system_prompt: Option<&str>, message: &str) -> String {
    match system_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prompt) => format!("{prompt}\n\n{USER_ROLE_MARKER}{message}"),
        None => message.to_owned(),
    }
}
