//! Marker store trait and in-memory implementation.
//!
//! Markers live in the host map application, which this crate never owns.
//! The [`MarkerStore`] trait abstracts the handle to it: create a marker
//! and get back the id the host assigned, update a marker in place, or
//! delete it. Every call can fail if the host is unreachable, and the
//! failure is handed back to the caller untouched.
//!
//! [`InMemoryMarkerStore`] keeps markers in a map and is used by tests and
//! by the `tracker-sync` binary when no host is attached.

use std::collections::BTreeMap;

use tracker_types::{Marker, MarkerId};

/// Errors reported by a marker store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    /// The host map application could not be reached.
    #[error("marker store unreachable: {message}")]
    Unreachable {
        /// Description of the failure.
        message: String,
    },

    /// The host refused the call.
    #[error("marker store rejected call for marker {marker_id:?}: {message}")]
    Rejected {
        /// The marker the call targeted, if any.
        marker_id: Option<MarkerId>,
        /// Description of the failure.
        message: String,
    },
}

/// Handle to the host map's marker collection.
pub trait MarkerStore {
    /// Create a marker and return the id assigned by the host.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError`] if the host cannot create the marker.
    fn create_marker(&mut self, marker: &Marker) -> Result<MarkerId, MarkerError>;

    /// Replace the position, label, icon, and color of a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError`] if the host cannot update the marker.
    fn update_marker(&mut self, id: MarkerId, marker: &Marker) -> Result<(), MarkerError>;

    /// Delete a marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError`] if the host cannot delete the marker.
    fn delete_marker(&mut self, id: MarkerId) -> Result<(), MarkerError>;
}

/// A marker store backed by an ordered map.
///
/// Ids are handed out sequentially starting at one. Updating or deleting
/// an unknown id is rejected, which makes stale ids visible in tests.
#[derive(Debug, Clone)]
pub struct InMemoryMarkerStore {
    markers: BTreeMap<MarkerId, Marker>,
    next_id: i64,
}

impl InMemoryMarkerStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            markers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Look up a marker.
    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// Whether a marker exists.
    pub fn contains(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    /// Number of markers currently shown.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether no markers are shown.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// All markers in id order.
    pub fn markers(&self) -> impl Iterator<Item = (&MarkerId, &Marker)> {
        self.markers.iter()
    }
}

impl Default for InMemoryMarkerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerStore for InMemoryMarkerStore {
    fn create_marker(&mut self, marker: &Marker) -> Result<MarkerId, MarkerError> {
        let id = MarkerId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(MarkerError::Rejected {
            marker_id: None,
            message: String::from("marker id space exhausted"),
        })?;
        self.markers.insert(id, marker.clone());
        Ok(id)
    }

    fn update_marker(&mut self, id: MarkerId, marker: &Marker) -> Result<(), MarkerError> {
        let slot = self.markers.get_mut(&id).ok_or(MarkerError::Rejected {
            marker_id: Some(id),
            message: String::from("unknown marker"),
        })?;
        marker.clone_into(slot);
        Ok(())
    }

    fn delete_marker(&mut self, id: MarkerId) -> Result<(), MarkerError> {
        self.markers
            .remove(&id)
            .map(|_| ())
            .ok_or(MarkerError::Rejected {
                marker_id: Some(id),
                message: String::from("unknown marker"),
            })
    }
}
