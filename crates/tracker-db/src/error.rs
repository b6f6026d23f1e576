//! Error types for the store.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] error. Lookups that match nothing are not errors; they return
//! `Ok(None)`.

/// Errors that can occur in the store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this error is a `UNIQUE` constraint violation, such as
    /// inserting a second tracker for an existing sender.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Sqlite(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
