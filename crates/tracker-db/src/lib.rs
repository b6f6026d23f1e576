//! Embedded `SQLite` store for trackers and their footprint history.
//!
//! # Architecture
//!
//! ```text
//! TrackerDb (SqlitePool, one writer)
//!     |
//!     +-- TrackerStore    (trackers: identity, display data, report merge)
//!     +-- FootprintStore  (history: append-only positions, marker links)
//! ```
//!
//! A tracker's position is never stored on its row; it is the newest
//! footprint. Deleting a tracker cascades to its footprints.
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool and configuration
//! - [`schema`] -- Table definitions and the destructive upgrade policy
//! - [`tracker_store`] -- Tracker lookup, insert, merge, removal
//! - [`footprint_store`] -- Footprint queries and marker links
//! - [`error`] -- Shared error types

pub mod error;
pub mod footprint_store;
pub mod schema;
pub mod sqlite;
pub mod tracker_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use footprint_store::{FootprintStore, HistoryRow};
pub use schema::{SCHEMA_VERSION, SchemaAction};
pub use sqlite::{SqliteConfig, TrackerDb};
pub use tracker_store::{TrackerRow, TrackerStore, UpdateOutcome};
