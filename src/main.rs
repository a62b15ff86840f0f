//! mail-imap-sync-rs: one-shot IMAP mailbox migration over TLS
//!
//! Mirrors every folder and message from a source account onto a destination
//! account: folder discovery and statistics, operator confirmation, then a
//! sequential per-folder, per-message transfer with isolated failure
//! handling.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading, CLI, and tracing setup
//! - [`config`]: Environment-driven configuration for both accounts
//! - [`errors`]: Application error model
//! - [`imap`]: IMAP transport/session operations with timeout wrappers
//! - [`store`]: The `MailStore` seam between engine and transport
//! - [`models`]: Typed boundary records and the append-only run log
//! - [`inventory`]: Read-only folder statistics pass
//! - [`sync`]: Folder provisioning, transfer engine, and orchestration
//! - [`ui`]: Statistics tables, confirmation gate, progress, log rendering

mod config;
mod errors;
mod imap;
mod inventory;
mod models;
mod store;
mod sync;
mod ui;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use config::SyncConfig;
use models::RunState;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Mirror every folder and message from one IMAP account onto another
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Skip the interactive confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Durable diagnostic log file (every recoverable error is recorded here)
    #[arg(long, default_value = "sync.log")]
    log_file: PathBuf,

    /// Write a machine-readable JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Application entry point
///
/// Initializes tracing (stderr for the operator, an append-mode file for the
/// durable diagnostic record), loads configuration, and runs the sync. Exits
/// non-zero only on setup failure: configuration, connection, or
/// authentication. An operator decline and a completed-with-failures run
/// both exit cleanly; per-item failures live in the log.
///
/// # Environment Variables
///
/// See [`SyncConfig::load_from_env`] for full configuration options.
///
/// # Example
///
/// ```no_run
/// MAIL_SYNC_SOURCE_HOST=imap.old-provider.com \
/// MAIL_SYNC_SOURCE_USER=user@old-provider.com \
/// MAIL_SYNC_SOURCE_PASS=app-password \
/// MAIL_SYNC_DEST_HOST=imap.new-provider.com \
/// MAIL_SYNC_DEST_USER=user@new-provider.com \
/// MAIL_SYNC_DEST_PASS=other-password \
/// cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cli.log_file)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(LevelFilter::DEBUG),
        )
        .init();

    let config = SyncConfig::load_from_env()?;
    let (state, log) = sync::run(&config, cli.yes).await?;

    if state == RunState::Cancelled {
        ui::render_cancelled();
        return Ok(());
    }

    ui::render_run_log(&log);
    ui::render_completed();

    if let Some(path) = cli.report {
        let report = serde_json::json!({
            "started_at": log.started_at,
            "transferred": log.transferred(),
            "failed": log.failed(),
            "events": log.events,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "wrote run report");
    }

    Ok(())
}
