//! Database initialization
//!
//! Owns the single storage handle for the process. Components never look the
//! pool up implicitly: `Database::init` builds it, callers pass `pool()` into
//! each component, and `shutdown` closes it.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default connection pool size for file-backed databases
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default SQLite busy timeout
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Pool tuning for `Database::init_with`
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Process-wide storage resource
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the database file and bring the schema up to date
    pub async fn init(db_path: &Path) -> Result<Self> {
        Self::init_with(db_path, &DatabaseOptions::default()).await
    }

    pub async fn init_with(db_path: &Path, options: &DatabaseOptions) -> Result<Self> {
        let pool = init_database(db_path, options).await?;
        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Private in-memory database on a single pinned connection
    ///
    /// Every pooled connection to `:memory:` would otherwise see its own empty
    /// database, so the pool is capped at one connection that never expires.
    pub async fn init_in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        crate::db::migrations::run_migrations(&pool).await?;

        Ok(Self { pool, path: None })
    }

    /// Connection pool to hand to components
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Backing file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close every pooled connection, waiting for checked-out ones to return
    pub async fn shutdown(self) {
        self.pool.close().await;
        match &self.path {
            Some(path) => info!("Closed database: {}", path.display()),
            None => info!("Closed in-memory database"),
        }
    }
}

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, options: &DatabaseOptions) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows concurrent readers alongside the single writer
    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(options.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(connect_options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    crate::db::migrations::run_migrations(&pool).await?;

    info!("Database busy timeout set to {} ms", options.busy_timeout_ms);

    Ok(pool)
}
