//! Error type for the reconciler.
//!
//! [`ReconcileError`] carries store and marker failures to the caller
//! unchanged. Nothing is retried or rolled back: a failure partway through
//! a trail sync leaves the markers already touched as they are.

use tracker_db::DbError;

use crate::marker::MarkerError;

/// Errors that can occur while processing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A database read or write failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// A call to the host map failed.
    #[error("marker error: {source}")]
    Marker {
        /// The underlying marker store error.
        #[from]
        source: MarkerError,
    },
}
