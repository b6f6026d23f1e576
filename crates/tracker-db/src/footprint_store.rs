//! Footprint history persistence.
//!
//! Footprints are append-only position samples. After insert the only
//! column ever rewritten is `moid`, which links a footprint to the marker
//! mirroring it on the host map.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracker_types::{Footprint, FootprintId, MarkerId, Position, TrackerId};

use crate::error::DbError;

/// Operations on the `history` table.
pub struct FootprintStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FootprintStore<'a> {
    /// Create a new footprint store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a footprint for a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails, including when the
    /// tracker does not exist.
    pub async fn insert_footprint(
        &self,
        tracker_id: TrackerId,
        position: &Position,
    ) -> Result<FootprintId, DbError> {
        insert_history_row(self.pool, tracker_id, position).await
    }

    /// All footprints of a tracker, newest first.
    ///
    /// Footprints sharing a timestamp are ordered by insertion, latest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn list_footprints(&self, tracker_id: TrackerId) -> Result<Vec<Footprint>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT point_id, tracker_id, moid, latitude, longitude, speed, battery, signal, time
              FROM history
              WHERE tracker_id = ?1
              ORDER BY time DESC, point_id DESC",
        )
        .bind(tracker_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(HistoryRow::into_footprint).collect())
    }

    /// The most recent footprint of a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn latest_footprint(
        &self,
        tracker_id: TrackerId,
    ) -> Result<Option<Footprint>, DbError> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r"SELECT point_id, tracker_id, moid, latitude, longitude, speed, battery, signal, time
              FROM history
              WHERE tracker_id = ?1
              ORDER BY time DESC, point_id DESC
              LIMIT 1",
        )
        .bind(tracker_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(HistoryRow::into_footprint))
    }

    /// Link a footprint to a marker, or unlink it with `None`.
    ///
    /// Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn set_footprint_marker_id(
        &self,
        footprint_id: FootprintId,
        marker_id: Option<MarkerId>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query("UPDATE history SET moid = ?1 WHERE point_id = ?2")
            .bind(marker_id.map(MarkerId::into_inner))
            .bind(footprint_id.into_inner())
            .execute(self.pool)
            .await?;

        tracing::debug!(%footprint_id, ?marker_id, "Set footprint marker id");
        Ok(result.rows_affected())
    }

    /// Unlink every footprint of a tracker from its marker.
    ///
    /// Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn clear_footprint_marker_ids(&self, tracker_id: TrackerId) -> Result<u64, DbError> {
        let result = sqlx::query("UPDATE history SET moid = NULL WHERE tracker_id = ?1")
            .bind(tracker_id.into_inner())
            .execute(self.pool)
            .await?;

        tracing::debug!(
            %tracker_id,
            cleared = result.rows_affected(),
            "Cleared footprint marker ids"
        );
        Ok(result.rows_affected())
    }

    /// Number of footprints stored for a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn count_footprints(&self, tracker_id: TrackerId) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE tracker_id = ?1")
            .bind(tracker_id.into_inner())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Insert one history row on any executor, so it can join a transaction.
pub(crate) async fn insert_history_row<'e, E>(
    executor: E,
    tracker_id: TrackerId,
    position: &Position,
) -> Result<FootprintId, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r"INSERT INTO history (tracker_id, latitude, longitude, speed, battery, signal, time)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(tracker_id.into_inner())
    .bind(position.latitude)
    .bind(position.longitude)
    .bind(position.speed)
    .bind(position.battery)
    .bind(position.signal)
    .bind(position.time)
    .execute(executor)
    .await?;

    let footprint_id = FootprintId::new(result.last_insert_rowid());
    tracing::debug!(%tracker_id, %footprint_id, time = position.time, "Inserted footprint");
    Ok(footprint_id)
}

/// A row from the `history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    /// Auto-incremented point id.
    pub point_id: i64,
    /// Owning tracker.
    pub tracker_id: i64,
    /// Marker id, `NULL` when not mirrored.
    pub moid: Option<i64>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed.
    pub speed: f32,
    /// Battery level.
    pub battery: i32,
    /// Signal level.
    pub signal: i32,
    /// Fix time in epoch milliseconds.
    pub time: i64,
}

impl HistoryRow {
    /// The position stored in this row.
    pub const fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            battery: self.battery,
            signal: self.signal,
            time: self.time,
        }
    }

    /// Convert into the domain type.
    pub fn into_footprint(self) -> Footprint {
        Footprint {
            id: FootprintId::new(self.point_id),
            tracker_id: TrackerId::new(self.tracker_id),
            marker_id: self.moid.map(MarkerId::new),
            position: self.position(),
        }
    }
}
