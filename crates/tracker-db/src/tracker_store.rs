//! Tracker persistence and the merge of incoming reports.
//!
//! A tracker row holds identity and display data only. Its position is
//! always read from the newest footprint, so the displayed snapshot can
//! never move backwards in time no matter what order reports arrive in.

use sqlx::SqlitePool;
use tracker_types::{MarkerId, NewTracker, Position, Tracker, TrackerId, TrackerReport};

use crate::error::DbError;
use crate::footprint_store::{FootprintStore, insert_history_row};

/// Operations on the `trackers` table.
pub struct TrackerStore<'a> {
    pool: &'a SqlitePool,
}

/// Result of merging one report through [`TrackerStore::update_tracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The tracker as it should now be displayed.
    pub tracker: Tracker,
    /// Whether the tracker was seen for the first time.
    pub created: bool,
    /// Whether a footprint row was appended.
    pub footprint_recorded: bool,
    /// Whether the tracker row and snapshot took the report's values.
    /// False for reports older than the stored snapshot.
    pub snapshot_advanced: bool,
}

impl<'a> TrackerStore<'a> {
    /// Create a new tracker store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a tracker by sender, merged with its newest footprint.
    ///
    /// Returns `None` when the sender is unknown or has no footprints.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a query fails.
    pub async fn get_tracker(&self, sender: &str) -> Result<Option<Tracker>, DbError> {
        let Some(row) = self.get_tracker_row(sender).await? else {
            return Ok(None);
        };

        let latest = FootprintStore::new(self.pool)
            .latest_footprint(TrackerId::new(row.id))
            .await?;

        Ok(latest.map(|footprint| row.into_tracker(footprint.position)))
    }

    /// Look up the bare tracker row by sender.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn get_tracker_row(&self, sender: &str) -> Result<Option<TrackerRow>, DbError> {
        let row = sqlx::query_as::<_, TrackerRow>(
            r"SELECT id, moid, imei, sender, title, icon
              FROM trackers
              WHERE sender = ?1",
        )
        .bind(sender)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a tracker and its first footprint.
    ///
    /// Both rows are written in one transaction, so a tracker never exists
    /// without history.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if either insert fails. A sender that is
    /// already stored fails the `UNIQUE` constraint; see
    /// [`DbError::is_unique_violation`].
    pub async fn insert_tracker(&self, tracker: &NewTracker) -> Result<TrackerId, DbError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"INSERT INTO trackers (moid, title, icon, imei, sender)
              VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(tracker.marker_id.map(MarkerId::into_inner))
        .bind(&tracker.name)
        .bind(tracker.icon.as_deref())
        .bind(tracker.imei.as_deref())
        .bind(&tracker.sender)
        .execute(&mut *tx)
        .await?;

        let tracker_id = TrackerId::new(result.last_insert_rowid());
        insert_history_row(&mut *tx, tracker_id, &tracker.position).await?;

        tx.commit().await?;

        tracing::info!(sender = %tracker.sender, %tracker_id, "Inserted tracker");
        Ok(tracker_id)
    }

    /// Merge an incoming report into the store.
    ///
    /// - A missing or zero report time is replaced by the current time.
    /// - A blank name or icon, or a missing device id or marker id, keeps
    ///   the stored value.
    /// - A footprint is appended when the report's time, latitude, or
    ///   longitude differs from the stored snapshot.
    /// - The tracker row is rewritten, and the returned tracker takes the
    ///   report's position, only when the report is not older than the
    ///   stored snapshot. Older reports return the stored tracker.
    /// - An unknown sender is inserted, named after the sender when the
    ///   report has no name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any read or write fails.
    pub async fn update_tracker(&self, report: &TrackerReport) -> Result<UpdateOutcome, DbError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.update_tracker_at(report, now).await
    }

    /// [`TrackerStore::update_tracker`] with an explicit current time in
    /// epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any read or write fails.
    pub async fn update_tracker_at(
        &self,
        report: &TrackerReport,
        now: i64,
    ) -> Result<UpdateOutcome, DbError> {
        let incoming = report.position_at(report.time_or(now));

        let Some(stored) = self.get_tracker(&report.sender).await? else {
            let tracker = NewTracker::from_report(report, incoming);
            let id = self.insert_tracker(&tracker).await?;
            return Ok(UpdateOutcome {
                tracker: tracker.into_tracker(id),
                created: true,
                footprint_recorded: true,
                snapshot_advanced: true,
            });
        };

        let footprint_recorded = incoming.differs_from(&stored.position);
        if footprint_recorded {
            insert_history_row(self.pool, stored.id, &incoming).await?;
        }

        if incoming.time < stored.position.time {
            tracing::debug!(
                sender = %stored.sender,
                incoming_time = incoming.time,
                stored_time = stored.position.time,
                footprint_recorded,
                "Report older than stored snapshot"
            );
            return Ok(UpdateOutcome {
                tracker: stored,
                created: false,
                footprint_recorded,
                snapshot_advanced: false,
            });
        }

        let merged = merge_report(stored, report, incoming);
        self.write_tracker_row(&merged).await?;

        Ok(UpdateOutcome {
            tracker: merged,
            created: false,
            footprint_recorded,
            snapshot_advanced: true,
        })
    }

    /// Point a tracker at a new marker, or unlink it with `None`.
    ///
    /// Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn set_tracker_marker_id(
        &self,
        tracker_id: TrackerId,
        marker_id: Option<MarkerId>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query("UPDATE trackers SET moid = ?1 WHERE id = ?2")
            .bind(marker_id.map(MarkerId::into_inner))
            .bind(tracker_id.into_inner())
            .execute(self.pool)
            .await?;

        tracing::debug!(%tracker_id, ?marker_id, "Set tracker marker id");
        Ok(result.rows_affected())
    }

    /// Delete the tracker with the given sender. Its footprints cascade.
    ///
    /// Returns whether a tracker was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the delete fails.
    pub async fn remove_tracker(&self, sender: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM trackers WHERE sender = ?1")
            .bind(sender)
            .execute(self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        tracing::info!(sender, removed, "Removed tracker");
        Ok(removed)
    }

    /// All tracker rows, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn list_trackers(&self) -> Result<Vec<TrackerRow>, DbError> {
        let rows = sqlx::query_as::<_, TrackerRow>(
            "SELECT id, moid, imei, sender, title, icon FROM trackers",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    async fn write_tracker_row(&self, tracker: &Tracker) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE trackers
              SET moid = ?1, title = ?2, icon = ?3, imei = ?4
              WHERE id = ?5",
        )
        .bind(tracker.marker_id.map(MarkerId::into_inner))
        .bind(&tracker.name)
        .bind(tracker.icon.as_deref())
        .bind(tracker.imei.as_deref())
        .bind(tracker.id.into_inner())
        .execute(self.pool)
        .await?;

        tracing::debug!(sender = %tracker.sender, tracker_id = %tracker.id, "Updated tracker");
        Ok(())
    }
}

/// Apply a report that is not older than the stored snapshot.
fn merge_report(stored: Tracker, report: &TrackerReport, position: Position) -> Tracker {
    Tracker {
        id: stored.id,
        marker_id: report.marker_id.or(stored.marker_id),
        name: report
            .display_name()
            .map_or(stored.name, str::to_owned),
        icon: report.display_icon().map(str::to_owned).or(stored.icon),
        imei: report.imei.clone().or(stored.imei),
        sender: stored.sender,
        position,
    }
}

/// A row from the `trackers` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TrackerRow {
    /// Tracker id.
    pub id: i64,
    /// Marker id, `NULL` when not mirrored.
    pub moid: Option<i64>,
    /// Device identifier.
    pub imei: Option<String>,
    /// Sender address.
    pub sender: String,
    /// Display name.
    pub title: Option<String>,
    /// Icon reference.
    pub icon: Option<String>,
}

impl TrackerRow {
    /// Combine the row with a position to form the domain type.
    ///
    /// A missing title falls back to the sender.
    pub fn into_tracker(self, position: Position) -> Tracker {
        Tracker {
            id: TrackerId::new(self.id),
            marker_id: self.moid.map(MarkerId::new),
            name: self.title.unwrap_or_else(|| self.sender.clone()),
            icon: self.icon,
            imei: self.imei,
            sender: self.sender,
            position,
        }
    }
}
