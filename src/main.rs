// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Site Gateway Service
//!
//! Rate-limited relay behind the website's contact form, newsletter
//! sign-up and chat widget.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env` if
//! present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `APP_ENV` / `NODE_ENV`: `development` simulates missing upstreams
//! - `N8N_CONTACT_WEBHOOK_URL`, `N8N_NEWSLETTER_WEBHOOK`: workflow webhooks
//! - `OPENAI_API_KEY`: completion API key
//! - `UPSTREAM_TIMEOUT_MS`: outbound timeout (default: 10000)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use site_gateway::{
    config::Config,
    handlers::AppState,
    server::{router, spawn_sweeper},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load environment variables
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "Failed to read .env file");
        }
    }

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        environment = ?config.environment,
        contact_limit = config.rate_limit.contact.limit,
        newsletter_limit = config.rate_limit.newsletter.limit,
        chat_limit = config.rate_limit.chat.limit,
        timeout_ms = config.upstream.timeout_ms,
        "Starting site gateway"
    );
    if config.upstream.contact_webhook_url.is_none() {
        warn!("N8N_CONTACT_WEBHOOK_URL not configured");
    }
    if config.upstream.newsletter_webhook_url.is_none() {
        warn!("N8N_NEWSLETTER_WEBHOOK not configured");
    }
    if config.upstream.completion_api_key.is_none() {
        warn!("OPENAI_API_KEY not configured");
    }

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::from_config(config)?);

    spawn_sweeper(state.clone());

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
