// Copyright (c) 2026 Tavern Protocol Contributors. MIT License.
// See LICENSE for details.

//! # Tavern Node
//!
//! Entry point for the `tavern-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the economy engine and the
//! room actor together, and serves the WebSocket gateway.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the session server
//! - `version` — print build version information

mod cli;
mod gateway;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use tavern_protocol::auth::{ChallengeAuthenticator, CredentialIssuer};
use tavern_protocol::config::EconomyLimits;
use tavern_protocol::crypto::{Ed25519Recovery, TavernKeypair};
use tavern_protocol::economy::EconomyEngine;
use tavern_protocol::session::SessionActor;
use tavern_protocol::storage::quota::offset_from_hours;
use tavern_protocol::storage::TavernDb;

use cli::{Commands, TavernNodeCli};
use logging::LogFormat;
use metrics::GatewayMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TavernNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full session server: storage, engine, room actor, gateway.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "tavern_node=info,tavern_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        listen = %args.listen,
        data_dir = %args.data_dir.display(),
        quota_offset_hours = args.quota_offset_hours,
        "starting tavern-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = TavernDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Credential signing key ---
    let keypair = match &args.credential_key {
        Some(seed) => TavernKeypair::from_seed_hex(seed)
            .map_err(|e| anyhow::anyhow!("invalid credential key seed: {e}"))?,
        None => {
            tracing::warn!(
                "no credential key configured; using an ephemeral key — \
                 issued credentials will not survive a restart"
            );
            TavernKeypair::generate()
        }
    };
    tracing::info!(issuer = %keypair.address(), "credential issuer ready");

    // --- Core components, constructor-injected ---
    let offset = offset_from_hours(args.quota_offset_hours);
    let engine = EconomyEngine::with_offset(db, EconomyLimits::default(), offset);
    let authenticator = ChallengeAuthenticator::new(Arc::new(Ed25519Recovery));
    let issuer = CredentialIssuer::new(keypair);

    // --- The room ---
    let room = SessionActor::spawn(engine, authenticator, issuer);

    // --- Gateway ---
    let state = gateway::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            tavern_protocol::config::PROTOCOL_VERSION,
        ),
        room,
        metrics: Arc::new(GatewayMetrics::new()),
    };
    let router = gateway::create_router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind listener on {}", args.listen))?;
    tracing::info!("gateway listening on {}", args.listen);

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!("gateway server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("tavern-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tavern-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", tavern_protocol::config::PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
