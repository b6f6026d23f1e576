//! Report reconciliation and map marker mirroring.
//!
//! # Architecture
//!
//! ```text
//! TrackerReport
//!     |
//!     v
//! Reconciler ---- TrackerStore / FootprintStore (tracker-db)
//!     |
//!     +-- tracker marker  (one per tracker, at its newest position)
//!     +-- footprint trail (up to N markers behind it)
//!     |
//!     v
//! MarkerStore (host map application)
//! ```
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration and marker settings
//! - [`marker`] -- Marker store trait and in-memory implementation
//! - [`reconciler`] -- Incoming report processing
//! - [`trail`] -- Footprint trail mirroring
//! - [`error`] -- Reconciliation errors

pub mod config;
pub mod error;
pub mod marker;
pub mod reconciler;
pub mod trail;

pub use config::{ConfigError, DatabaseConfig, LoggingConfig, MarkerConfig, TrackerConfig};
pub use error::ReconcileError;
pub use marker::{InMemoryMarkerStore, MarkerError, MarkerStore};
pub use reconciler::{ProcessOutcome, Reconciler};
pub use trail::{TrailSync, footprint_label, footprint_marker, sync_footprint_trail};
