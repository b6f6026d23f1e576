//! Table definitions and the schema version policy.
//!
//! The schema version lives in `PRAGMA user_version`. A version of zero
//! means the database is new. Any other mismatch triggers a destructive
//! upgrade: both tables are dropped and recreated inside one transaction,
//! discarding all stored data. There are no migrations.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbError;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 3;

const CREATE_TRACKERS: &str = r"CREATE TABLE trackers (
    id INTEGER PRIMARY KEY,
    moid INTEGER,
    imei TEXT,
    sender TEXT NOT NULL UNIQUE,
    title TEXT,
    icon TEXT
)";

const CREATE_HISTORY: &str = r"CREATE TABLE history (
    point_id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracker_id INTEGER NOT NULL,
    moid INTEGER,
    latitude REAL,
    longitude REAL,
    speed REAL,
    battery INTEGER,
    signal INTEGER,
    time INTEGER,
    FOREIGN KEY (tracker_id) REFERENCES trackers(id) ON DELETE CASCADE
)";

const CREATE_HISTORY_INDEX: &str =
    "CREATE INDEX history_tracker_time ON history (tracker_id, time DESC)";

/// What [`prepare`] did to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    /// The database was new; tables were created.
    Created,
    /// The schema was already current.
    Unchanged,
    /// The schema was at another version and was rebuilt, losing all data.
    Rebuilt {
        /// The version found on disk.
        from: i64,
    },
}

/// Bring the schema to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`DbError::Sqlite`] if any statement fails. A failed upgrade is
/// rolled back and leaves the old tables in place.
pub async fn prepare(pool: &SqlitePool) -> Result<SchemaAction, DbError> {
    let version = user_version(pool).await?;

    if version == SCHEMA_VERSION {
        return Ok(SchemaAction::Unchanged);
    }

    if version == 0 {
        let mut conn = pool.acquire().await?;
        recreate_tables(&mut conn).await?;
        tracing::info!(version = SCHEMA_VERSION, "Created tracker schema");
        return Ok(SchemaAction::Created);
    }

    tracing::warn!(
        from = version,
        to = SCHEMA_VERSION,
        "Schema version changed, dropping all trackers and history"
    );

    let mut tx = pool.begin().await?;
    recreate_tables(&mut tx).await?;
    tx.commit().await?;

    Ok(SchemaAction::Rebuilt { from: version })
}

/// Read `PRAGMA user_version`.
///
/// # Errors
///
/// Returns [`DbError::Sqlite`] if the pragma cannot be read.
pub async fn user_version(pool: &SqlitePool) -> Result<i64, DbError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Overwrite `PRAGMA user_version`. Pragmas cannot take bound parameters.
///
/// # Errors
///
/// Returns [`DbError::Sqlite`] if the pragma cannot be written.
pub async fn set_user_version(conn: &mut SqliteConnection, version: i64) -> Result<(), DbError> {
    sqlx::query(&format!("PRAGMA user_version = {version}"))
        .execute(conn)
        .await?;
    Ok(())
}

/// Drop both tables if present and create them from scratch.
async fn recreate_tables(conn: &mut SqliteConnection) -> Result<(), DbError> {
    sqlx::query("DROP TABLE IF EXISTS history")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS trackers")
        .execute(&mut *conn)
        .await?;
    sqlx::query(CREATE_TRACKERS).execute(&mut *conn).await?;
    sqlx::query(CREATE_HISTORY).execute(&mut *conn).await?;
    sqlx::query(CREATE_HISTORY_INDEX).execute(&mut *conn).await?;
    set_user_version(conn, SCHEMA_VERSION).await?;
    Ok(())
}
