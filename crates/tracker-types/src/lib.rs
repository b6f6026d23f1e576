//! Shared type definitions for tracker synchronization.
//!
//! Both the store and the reconciler speak in these types; neither owns
//! them.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for tracker, footprint, and marker ids
//! - [`structs`] -- Trackers, footprints, incoming reports, and map markers

pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{FootprintId, MarkerId, TrackerId};
pub use structs::{Footprint, Marker, NewTracker, Position, Tracker, TrackerReport, non_blank};
