// ABOUTME: Domain models re-exported from the relay-core foundation crate
// ABOUTME: Tenant settings, conversation records, and classification types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use relay_core::models::*;
