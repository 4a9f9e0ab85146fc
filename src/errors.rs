// ABOUTME: Unified error handling re-exported from the relay-core foundation crate
// ABOUTME: Keeps `crate::errors::AppError` paths stable across the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use relay_core::errors::*;
