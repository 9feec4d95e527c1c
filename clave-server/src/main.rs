//! Clave license server
//!
//! Serves license creation, activation and token validation over HTTP,
//! backed by SQLite.
//!
//! Usage:
//!   clave-server --hmac-secret <base64> --signing-key <base64> --database clave.db
//!
//! Every flag can also be set through its `CLAVE_*` environment variable.

use anyhow::{Context, Result};
use clap::Parser;
use clave_license::LicenseService;
use clave_server::config::Args;
use clave_server::{build_router, AppState};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Clave server starting...");
    debug!(?args, "configuration loaded");

    let keys = args.key_material().context("invalid key material")?;
    let store = args
        .open_store()
        .with_context(|| format!("failed to open database {}", args.database))?;
    let service = LicenseService::new(Arc::new(store), &keys, args.engine_settings())
        .context("failed to build license engine")?;

    let app = build_router(AppState::new(Arc::new(service), args.request_timeout()));
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    info!(
        addr = %listener.local_addr()?,
        public_key = %keys.public_key_base64(),
        audience = %args.audience,
        "HTTP API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Clave server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
