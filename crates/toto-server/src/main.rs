//! Toto Live server
//!
//! HTTP service behind the viewer app and the admin panel.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use toto_core::config::{self, Config};
use toto_core::tracing_init::{DEFAULT_FILTER, init_tracing};
use toto_server::api::{self, AppState};
use toto_server::auth::JwtManager;
use toto_server::presence::reconcile_watchers;
use toto_server::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "toto-server")]
#[command(version, about = "Toto Live server - viewer and admin HTTP API")]
struct Args {
    /// Address to listen on. Overrides the config file.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Config file to use instead of the global one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "TOTO_JWT_SECRET", default_value = "dev-secret-change-me")]
    jwt_secret: String,

    /// Access token TTL in seconds.
    #[arg(long)]
    access_ttl: Option<i64>,

    /// Refresh token TTL in seconds.
    #[arg(long)]
    refresh_ttl: Option<i64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// OTLP collector endpoint for traces and metrics.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "TOTO_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an admin account and exit.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TOTO_ADMIN_PASSWORD")]
        password: String,
    },
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(path) = &self.db_path {
            config.server.database_path = Some(path.clone());
        }
        if let Some(ttl) = self.access_ttl {
            config.auth.access_ttl_secs = ttl;
        }
        if let Some(ttl) = self.refresh_ttl {
            config.auth.refresh_ttl_secs = ttl;
        }
        if self.log_json {
            config.server.log_json = true;
        }
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => config::database_path().context("Cannot determine data directory")?,
    };
    info!(path = %path.display(), "Opening database");
    Ok(Database::open(&path).await?)
}

/// Periodic jobs: presence expiry, chat channel pruning, and watcher
/// reconciliation.
fn spawn_background(state: &AppState, config: &Config) {
    let presence = state.presence.clone();
    let chat = state.chat.clone();
    let meters = state.meters.clone();
    let sweep_every = Duration::from_secs(config.presence.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let expired = presence.sweep_expired(Instant::now());
            if !expired.is_empty() {
                info!(expired = expired.len(), "Presence leases expired");
                meters.presence_expired(expired.len());
            }
            chat.prune();
        }
    });

    if config.presence.reconcile_interval_secs == 0 {
        info!("Watcher reconciliation disabled");
        return;
    }
    let db = state.db.clone();
    let presence = state.presence.clone();
    let meters = state.meters.clone();
    let reconcile_every = Duration::from_secs(config.presence.reconcile_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(reconcile_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            match reconcile_watchers(&db, &presence).await {
                Ok(adjusted) => meters.watchers_reconciled(adjusted),
                Err(e) => warn!(error = %e, "Watcher reconciliation failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    init_tracing(DEFAULT_FILTER, config.server.log_json);

    #[cfg(feature = "metrics")]
    let metrics_guard = match &args.otlp_endpoint {
        Some(endpoint) => Some(toto_core::metrics::init_metrics(endpoint)?),
        None => None,
    };

    let db = open_database(&config).await?;

    if let Some(Command::CreateAdmin { email, password }) = &args.command {
        let account = api::auth::create_admin_account(&db, email, password).await?;
        info!(account_id = %account.id, email = %account.email, "Admin account ready");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting toto-server"
    );
    if db.count_admins().await? == 0 {
        warn!("No admin account exists; create one with `toto-server create-admin`");
    }

    let jwt = Arc::new(JwtManager::new(
        args.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_secs,
    ));
    let addr = config.server.addr;
    let state = AppState::new(db, jwt, config.clone());
    spawn_background(&state, &config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => {
                    warn!(error = %e, "Cannot listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    #[cfg(feature = "metrics")]
    {
        if let Some(guard) = metrics_guard {
            guard.shutdown()?;
        }
    }

    info!("Server stopped");
    Ok(())
}
