//! rpt-server - HTTP service for receiving problem tags
//!
//! Opens (or creates) the SQLite database, seeds configured employees and
//! serves the JSON API until Ctrl-C or SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rpt_common::config::{self, resolve_database_path};
use rpt_common::db::Database;
use rpt_common::registry::RegistryKind;
use rpt_common::Core;
use rpt_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "rpt-server", version, about = "Receiving problem tag service")]
struct Args {
    /// SQLite database file (overrides RPT_DATABASE and the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML config file (default: ~/.config/rpt/config.toml, then /etc/rpt/config.toml)
    #[arg(long, env = "RPT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long, env = "RPT_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (toml_config, config_source) = config::load(args.config.as_deref());

    let default_level = toml_config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    info!(
        "Starting rpt-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    let db_path = resolve_database_path(args.database.as_deref(), &toml_config);
    info!("Database path: {}", db_path.display());

    let db = Database::init(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let core = Core::new(db.pool().clone());
    if !toml_config.seed_employees.is_empty() {
        let seeded = core
            .registry()
            .seed(RegistryKind::Employee, &toml_config.seed_employees)
            .await?;
        info!(seeded, "Seeded employees");
    }

    let app = build_router(AppState::new(core));

    let bind = args.bind.unwrap_or(toml_config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("rpt-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.shutdown().await;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
