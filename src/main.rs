//! Rekening Service - Main Application Entry Point
//!
//! A REST API for bank accounts: opening accounts, balance inquiry, and
//! deposits (tabung) and withdrawals (tarik) recorded in an append-only
//! mutation ledger.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Parse command line flags and load configuration
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wire store, services and router
//! 5. Serve until SIGINT/SIGTERM, then drain in-flight requests

mod app;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::{
    app::{AppState, build_app},
    store::PgLedgerStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = config::Args::parse();
    let config = config::Config::from_env(&args.config)?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config).await.inspect_err(|err| {
        tracing::error!(error = %err, "Failed to connect to database");
    })?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = PgLedgerStore::new(pool.clone(), tracing::info_span!("ledger_store"));
    let app = build_app(AppState::new(store, config.account_number_width));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
