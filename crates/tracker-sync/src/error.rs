//! Error types for the `tracker-sync` binary.
//!
//! [`SyncError`] wraps every failure mode of startup and the report loop
//! so `main` can propagate with `?`.

/// Top-level error for the `tracker-sync` binary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tracker_core::ConfigError,
    },

    /// Opening the database failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: tracker_db::DbError,
    },

    /// Processing a report failed.
    #[error("reconcile error: {source}")]
    Reconcile {
        /// The underlying reconcile error.
        #[from]
        source: tracker_core::ReconcileError,
    },

    /// A report line was not valid JSON.
    #[error("invalid report on line {line}: {source}")]
    Json {
        /// One-based input line number.
        line: u64,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// Reading standard input failed.
    #[error("input error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
