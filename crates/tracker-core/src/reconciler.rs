//! Incoming report processing.
//!
//! [`Reconciler`] owns the database handle and the marker store handle and
//! drives one report at a time to completion:
//!
//! ```text
//! report --> known sender? --yes--> merge (TrackerStore::update_tracker)
//!                 |                   --> update tracker marker
//!                 |                   --> sync footprint trail
//!                 no
//!                 +--> create tracker marker --> insert tracker + footprint
//! ```
//!
//! Callers must not process two reports concurrently; every method takes
//! `&mut self`.

use tracker_db::{FootprintStore, TrackerDb, TrackerStore};
use tracker_types::{Marker, MarkerId, NewTracker, Position, Tracker, TrackerReport};

use crate::config::MarkerConfig;
use crate::error::ReconcileError;
use crate::marker::MarkerStore;
use crate::trail::{TrailSync, sync_footprint_trail};

/// Result of processing one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// The tracker as now displayed, including its marker id.
    pub tracker: Tracker,
    /// Whether the sender was seen for the first time.
    pub created: bool,
    /// Whether the report was archived as a footprint.
    pub footprint_recorded: bool,
    /// What the trail pass did. Empty for new trackers.
    pub trail: TrailSync,
}

/// Merges incoming reports into the store and mirrors them to the map.
pub struct Reconciler<M> {
    db: TrackerDb,
    markers: M,
    config: MarkerConfig,
}

impl<M: MarkerStore> Reconciler<M> {
    /// Create a reconciler over an opened database and a marker store.
    pub const fn new(db: TrackerDb, markers: M, config: MarkerConfig) -> Self {
        Self {
            db,
            markers,
            config,
        }
    }

    /// The database handle.
    pub const fn db(&self) -> &TrackerDb {
        &self.db
    }

    /// The marker store handle.
    pub const fn marker_store(&self) -> &M {
        &self.markers
    }

    /// The marker settings in effect.
    pub const fn config(&self) -> &MarkerConfig {
        &self.config
    }

    /// Give back the owned handles.
    pub fn into_parts(self) -> (TrackerDb, M) {
        (self.db, self.markers)
    }

    /// Process one incoming report.
    ///
    /// For a known sender the report is merged, the tracker marker is
    /// updated, and the footprint trail is re-synced. For a new sender a
    /// marker is created first and the tracker is stored with its id.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] on the first store or marker failure.
    pub async fn process_incoming_tracker(
        &mut self,
        report: &TrackerReport,
    ) -> Result<ProcessOutcome, ReconcileError> {
        let Self {
            db,
            markers,
            config,
        } = self;
        let store = TrackerStore::new(db.pool());

        tracing::debug!(
            sender = %report.sender,
            time = ?report.time,
            latitude = report.latitude,
            longitude = report.longitude,
            "Processing report"
        );

        if store.get_tracker(&report.sender).await?.is_none() {
            let now = chrono::Utc::now().timestamp_millis();
            let mut tracker =
                NewTracker::from_report(report, report.position_at(report.time_or(now)));

            let marker = tracker_marker(
                &tracker.name,
                &tracker.position,
                tracker.icon.as_deref(),
                config,
            );
            let marker_id = markers.create_marker(&marker)?;
            tracker.marker_id = Some(marker_id);

            let id = store.insert_tracker(&tracker).await?;
            tracing::info!(sender = %report.sender, tracker_id = %id, %marker_id, "New tracker");

            return Ok(ProcessOutcome {
                tracker: tracker.into_tracker(id),
                created: true,
                footprint_recorded: true,
                trail: TrailSync::default(),
            });
        }

        let outcome = store.update_tracker(report).await?;
        let tracker = mirror_tracker(db, markers, config, outcome.tracker).await?;
        let trail = sync_footprint_trail(db, markers, &tracker, config).await?;

        Ok(ProcessOutcome {
            tracker,
            created: outcome.created,
            footprint_recorded: outcome.footprint_recorded,
            trail,
        })
    }

    /// Delete a tracker, its footprints, and every marker they own.
    ///
    /// Markers are deleted before the rows, so a marker failure leaves the
    /// tracker in the store. Returns whether the tracker existed.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] on the first store or marker failure.
    pub async fn remove_tracker(&mut self, sender: &str) -> Result<bool, ReconcileError> {
        let store = TrackerStore::new(self.db.pool());
        let Some(row) = store.get_tracker_row(sender).await? else {
            return Ok(false);
        };

        let footprints = FootprintStore::new(self.db.pool())
            .list_footprints(row.id.into())
            .await?;
        for marker_id in footprints.iter().filter_map(|f| f.marker_id) {
            self.markers.delete_marker(marker_id)?;
        }
        if let Some(marker_id) = row.moid.map(MarkerId::new) {
            self.markers.delete_marker(marker_id)?;
        }

        Ok(store.remove_tracker(sender).await?)
    }

    /// Rebuild every marker from the store.
    ///
    /// For when the host map has lost its markers, for example after a
    /// restart: stored marker ids are forgotten, each tracker gets a new
    /// marker, and its trail is mirrored from scratch. Returns the number
    /// of trackers mirrored.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] on the first store or marker failure.
    pub async fn resync_all(&mut self) -> Result<usize, ReconcileError> {
        let Self {
            db,
            markers,
            config,
        } = self;
        let store = TrackerStore::new(db.pool());
        let footprints = FootprintStore::new(db.pool());

        let mut mirrored: usize = 0;
        for row in store.list_trackers().await? {
            let Some(mut tracker) = store.get_tracker(&row.sender).await? else {
                continue;
            };

            footprints.clear_footprint_marker_ids(tracker.id).await?;
            tracker.marker_id = None;

            let tracker = mirror_tracker(db, markers, config, tracker).await?;
            sync_footprint_trail(db, markers, &tracker, config).await?;
            mirrored = mirrored.saturating_add(1);
        }

        tracing::info!(trackers = mirrored, "Resynced markers");
        Ok(mirrored)
    }
}

/// Push a tracker's snapshot to its marker, creating the marker if the
/// tracker has none yet.
async fn mirror_tracker<M: MarkerStore>(
    db: &TrackerDb,
    markers: &mut M,
    config: &MarkerConfig,
    mut tracker: Tracker,
) -> Result<Tracker, ReconcileError> {
    let marker = tracker_marker(
        &tracker.name,
        &tracker.position,
        tracker.icon.as_deref(),
        config,
    );

    if let Some(marker_id) = tracker.marker_id {
        markers.update_marker(marker_id, &marker)?;
    } else {
        let marker_id = markers.create_marker(&marker)?;
        TrackerStore::new(db.pool())
            .set_tracker_marker_id(tracker.id, Some(marker_id))
            .await?;
        tracker.marker_id = Some(marker_id);
    }

    Ok(tracker)
}

/// The marker drawn for a tracker: its name at its latest position.
fn tracker_marker(
    name: &str,
    position: &Position,
    icon: Option<&str>,
    config: &MarkerConfig,
) -> Marker {
    Marker {
        latitude: position.latitude,
        longitude: position.longitude,
        label: name.to_owned(),
        icon: icon.map(str::to_owned),
        color: config.color,
    }
}
