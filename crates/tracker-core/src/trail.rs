//! Footprint trail mirroring.
//!
//! Behind each tracker marker the host map shows up to N earlier positions.
//! After every report the trail is rebuilt by rank: footprints are listed
//! newest first, the newest is skipped (the tracker marker already sits
//! there), the next N get markers, and anything beyond N that still has a
//! marker loses it.
//!
//! ```text
//! rank:    0        1 .. N            N+1 ..
//!          skipped  create or update  delete marker, clear id
//! ```
//!
//! Markers are reused by footprint, so a point that stays inside the
//! window keeps its marker. Ranks are recomputed on every pass; when
//! several footprints arrive between passes, points can drop out of the
//! window and new ones enter in the same pass.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use tracker_db::{FootprintStore, TrackerDb};
use tracker_types::{Footprint, Marker, Tracker};

use crate::config::MarkerConfig;
use crate::error::ReconcileError;
use crate::marker::MarkerStore;

/// What a trail pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrailSync {
    /// Markers created for footprints entering the window.
    pub created: usize,
    /// Markers updated in place.
    pub updated: usize,
    /// Markers deleted for footprints leaving the window.
    pub removed: usize,
}

/// Mirror the trail of `tracker` into `markers`.
///
/// A trail length of zero creates and updates nothing, but still deletes
/// markers left over from a longer trail.
///
/// # Errors
///
/// Returns [`ReconcileError`] on the first store or marker failure. Work
/// done before the failure is kept.
pub async fn sync_footprint_trail<M: MarkerStore>(
    db: &TrackerDb,
    markers: &mut M,
    tracker: &Tracker,
    config: &MarkerConfig,
) -> Result<TrailSync, ReconcileError> {
    let footprints = FootprintStore::new(db.pool());
    let trail = footprints.list_footprints(tracker.id).await?;
    let window = usize::try_from(config.footprint_trail_length).unwrap_or(usize::MAX);

    let mut sync = TrailSync::default();

    for (rank, footprint) in trail.iter().skip(1).enumerate() {
        if rank < window {
            let marker = footprint_marker(tracker, footprint, config);
            if let Some(marker_id) = footprint.marker_id {
                markers.update_marker(marker_id, &marker)?;
                sync.updated = sync.updated.saturating_add(1);
            } else {
                let marker_id = markers.create_marker(&marker)?;
                footprints
                    .set_footprint_marker_id(footprint.id, Some(marker_id))
                    .await?;
                sync.created = sync.created.saturating_add(1);
            }
        } else if let Some(marker_id) = footprint.marker_id {
            markers.delete_marker(marker_id)?;
            footprints.set_footprint_marker_id(footprint.id, None).await?;
            sync.removed = sync.removed.saturating_add(1);
        }
    }

    tracing::debug!(
        sender = %tracker.sender,
        footprints = trail.len(),
        created = sync.created,
        updated = sync.updated,
        removed = sync.removed,
        "Synced footprint trail"
    );

    Ok(sync)
}

/// The marker drawn for one footprint.
pub fn footprint_marker(tracker: &Tracker, footprint: &Footprint, config: &MarkerConfig) -> Marker {
    Marker {
        latitude: footprint.position.latitude,
        longitude: footprint.position.longitude,
        label: footprint_label(&tracker.name, footprint.position.time, &config.label_time_format),
        icon: None,
        color: config.color,
    }
}

/// `"<name> <local time>"`, falling back to the raw epoch milliseconds
/// when the time cannot be represented or formatted.
pub fn footprint_label(name: &str, time_ms: i64, time_format: &str) -> String {
    let mut label = format!("{name} ");

    let formatted = DateTime::<Utc>::from_timestamp_millis(time_ms).is_some_and(|utc| {
        let local = utc.with_timezone(&Local);
        write!(label, "{}", local.format(time_format)).is_ok()
    });

    if !formatted {
        label = format!("{name} {time_ms}");
    }
    label
}
