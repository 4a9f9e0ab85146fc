// ABOUTME: HTTP server assembly: router construction, listener, and graceful shutdown
// ABOUTME: Drains detached enrichment and persistence work before the process exits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server
//!
//! [`build_router`] mounts every route on one axum router. The chat routes
//! sit behind the rate limiter; health and recommendation routes do not.
//! [`run`] binds the listener and serves until Ctrl-C or SIGTERM, then waits
//! for tracked background work before returning.

use crate::constants::limits::MAX_REQUEST_BODY_BYTES;
use crate::errors::AppError;
use crate::middleware::rate_limit_middleware;
use crate::resources::ServerResources;
use crate::routes::{ChatRoutes, HealthRoutes, RecommendationRoutes};
use anyhow::{Context, Result};
use axum::middleware;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the application router
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let chat = ChatRoutes::routes(Arc::clone(&resources)).route_layer(middleware::from_fn_with_state(
        Arc::clone(&resources.rate_limiter),
        rate_limit_middleware,
    ));

    Router::new()
        .merge(chat)
        .merge(RecommendationRoutes::routes(Arc::clone(&resources)))
        .merge(HealthRoutes::routes(resources))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> AppError {
    AppError::not_found()
}

/// Serve until a shutdown signal arrives, then drain background work
///
/// # Errors
///
/// Returns an error if the address is invalid, the port cannot be bound, or
/// the server fails while running
pub async fn run(resources: Arc<ServerResources>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", resources.config.host, resources.config.http_port)
        .parse()
        .context("invalid server address/port")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(%addr, "Chat relay listening");

    let app = build_router(Arc::clone(&resources));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server failure")?;

    info!(
        pending = resources.tracker.len(),
        "Waiting for background work to finish"
    );
    resources.drain().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
