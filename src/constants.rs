// ABOUTME: Application constants re-exported from the relay-core foundation crate
// ABOUTME: Request limits, header names, and fallback values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use relay_core::constants::*;
