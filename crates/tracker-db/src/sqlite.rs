//! `SQLite` connection pool and schema lifecycle.
//!
//! The tracker database is a single-writer embedded store. The pool is
//! capped at one connection by default, which also keeps an in-memory
//! database alive and shared for the lifetime of the handle.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! so no database is needed at build time.

use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::DbError;
use crate::schema::{self, SchemaAction};

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tracker.db";

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 1;

/// Default connection acquire timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// `SQLite` connection URL.
    ///
    /// Format: `sqlite://path/to/file.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Timeout when waiting for a free connection.
    pub acquire_timeout: Duration,
}

impl SqliteConfig {
    /// Create a new configuration from a database URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_URL)
    }

    /// Set the maximum number of connections.
    ///
    /// Values above one are only meaningful for file-backed databases.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE_URL)
    }
}

/// Connection pool handle to the tracker database.
///
/// Wraps a [`sqlx::SqlitePool`]. Store types borrow the pool through
/// [`TrackerDb::pool`].
#[derive(Clone)]
pub struct TrackerDb {
    pool: SqlitePool,
}

impl TrackerDb {
    /// Connect to `SQLite` using the provided configuration.
    ///
    /// The database file is created if missing and foreign-key enforcement
    /// is enabled on every connection. Idle connections are never reaped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the connection fails.
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let connect_options: SqliteConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;
        let connect_options = connect_options.create_if_missing(true).foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(connect_options)
            .await?;

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "Connected to SQLite"
        );

        Ok(Self { pool })
    }

    /// Connect and bring the schema to the current version.
    ///
    /// See [`TrackerDb::prepare_schema`] for the upgrade policy.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema setup fails.
    pub async fn open(config: &SqliteConfig) -> Result<Self, DbError> {
        let db = Self::connect(config).await?;
        db.prepare_schema().await?;
        Ok(db)
    }

    /// Open a fresh in-memory database with the schema created.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if setup fails.
    pub async fn open_in_memory() -> Result<Self, DbError> {
        Self::open(&SqliteConfig::in_memory()).await
    }

    /// Create the schema on a new database, or upgrade an old one.
    ///
    /// Upgrading is destructive: both tables are dropped and recreated
    /// and every stored tracker and footprint is lost.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any schema statement fails.
    pub async fn prepare_schema(&self) -> Result<SchemaAction, DbError> {
        schema::prepare(&self.pool).await
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}
