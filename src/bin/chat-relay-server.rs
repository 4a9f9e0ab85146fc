// ABOUTME: Chat relay server binary: loads configuration, opens the database, and serves HTTP
// ABOUTME: Supports --http-port and --database-url overrides on top of the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Chat Relay Server Binary
//!
//! Starts the multi-tenant chat relay: SSE chat over Gemini, recommendation
//! intake, and health endpoints.

use anyhow::Result;
use chat_relay::config::{DatabaseUrl, ServerConfig};
use chat_relay::constants::service_names::CHAT_RELAY_SERVER;
use chat_relay::logging;
use chat_relay::resources::ServerResources;
use chat_relay::server;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = CHAT_RELAY_SERVER)]
#[command(about = "Multi-tenant chat relay streaming Gemini replies over SSE")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = DatabaseUrl::parse_url(&database_url);
    }
    info!("{}", config.summary());

    let resources = Arc::new(ServerResources::from_config(config).await?);
    if let Err(e) = server::run(resources).await {
        error!(error = %e, "Server stopped with an error");
        return Err(e);
    }
    Ok(())
}
