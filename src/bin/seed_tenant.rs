// ABOUTME: Tenant seeding utility for the chat relay
// ABOUTME: Creates or updates a tenant's prompt, allowed sources, and API key, then prints the key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Tenant seeder for the chat relay.
//!
//! Usage:
//! ```bash
//! # Create tenant 1001 with a generated key
//! cargo run --bin seed-tenant -- --account 1001
//!
//! # Restrict sources and set a prompt
//! cargo run --bin seed-tenant -- --account 1001 --source web --source kiosk \
//!     --system-prompt "You are a helpful guide."
//!
//! # Replace the key with a fresh one
//! cargo run --bin seed-tenant -- --account 1001 --rotate-key
//! ```

use anyhow::{Context, Result};
use chat_relay::config::DatabaseUrl;
use chat_relay::crypto::generate_api_key;
use chat_relay::database::Database;
use chat_relay::models::{AccountNumber, TenantSettings};
use clap::Parser;
use std::env;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "seed-tenant",
    about = "Chat relay tenant seeder",
    long_about = "Create or update a tenant's settings and print its effective API key"
)]
struct SeedArgs {
    /// Tenant account number
    #[arg(long)]
    account: AccountNumber,

    /// System prompt prepended to every message
    #[arg(long)]
    system_prompt: Option<String>,

    /// Allowed source client (repeatable); none means unrestricted
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Use this API key instead of keeping or generating one
    #[arg(long, conflicts_with = "rotate_key")]
    api_key: Option<String>,

    /// Replace any stored key with a freshly generated one
    #[arg(long)]
    rotate_key: bool,

    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = SeedArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let database_url = args
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:./data/chat_relay.db".into());
    let database = Database::new(&DatabaseUrl::parse_url(&database_url)).await?;

    let api_key = if args.rotate_key {
        Some(generate_api_key())
    } else {
        args.api_key
    };
    let settings = TenantSettings {
        account_number: args.account,
        system_prompt: args.system_prompt,
        sources: TenantSettings::normalize_sources(args.sources),
        api_key,
    };

    let stored = database
        .tenants()
        .upsert_settings(&settings)
        .await
        .context("Failed to store tenant settings")?;
    info!(
        account_number = %stored.account_number,
        sources = ?stored.sources,
        has_prompt = stored.system_prompt().is_some(),
        "Tenant settings stored"
    );

    let key = stored.api_key().context("Tenant has no API key")?;
    println!("{key}");

    database.close().await;
    Ok(())
}
