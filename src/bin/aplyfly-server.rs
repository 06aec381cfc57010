// ABOUTME: HTTP server binary exposing the chat dispatcher to the website widget
// ABOUTME: Probes upstream availability once at startup then serves until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Aplyfly

//! # Aplyfly Server Binary
//!
//! Starts the conversational response dispatcher behind an HTTP API. The
//! generative upstream is probed exactly once at construction; when it is
//! unavailable the server still starts and answers from the fallback pools.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use aplyfly_server::{
    chat::ChatDispatcher,
    config::ServerConfig,
    logging,
    routes::{ChatRoutes, HealthRoutes},
};

#[derive(Parser)]
#[command(name = "aplyfly-server")]
#[command(about = "Aplyfly website backend - conversational dispatcher and diagnostics API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!("Starting Aplyfly server");

    let dispatcher = Arc::new(ChatDispatcher::from_env());
    let status = dispatcher.status();
    if status.available {
        info!(model = %dispatcher.model(), "Generative upstream available");
    } else {
        info!(
            reason = status.reason.as_deref().unwrap_or("unknown"),
            "Generative upstream unavailable, serving fallback responses"
        );
    }

    let app = Router::new()
        .merge(ChatRoutes::routes(dispatcher))
        .merge(HealthRoutes::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("HTTP server listening on {bind_address}");
    info!("Available endpoints:");
    info!("  POST /api/chat        - dispatch a widget message (JSON or SSE)");
    info!("  GET  /api/chat/status - upstream capability diagnostics");
    info!("  GET  /health          - liveness check");
    info!("  GET  /ready           - readiness check");

    axum::serve(listener, app).await?;

    Ok(())
}
