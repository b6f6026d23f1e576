//! Integration tests for the tracker store.
//!
//! Every test runs against a private in-memory `SQLite` database, so no
//! external services are needed.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use tracker_db::{FootprintStore, SCHEMA_VERSION, SchemaAction, TrackerDb, TrackerStore};
use tracker_types::{MarkerId, NewTracker, TrackerId, TrackerReport};

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> TrackerDb {
    TrackerDb::open_in_memory()
        .await
        .expect("Failed to open in-memory database")
}

fn new_tracker(sender: &str, time: i64, latitude: f64, longitude: f64) -> NewTracker {
    NewTracker {
        marker_id: Some(MarkerId::new(100)),
        name: sender.to_owned(),
        icon: None,
        imei: None,
        sender: sender.to_owned(),
        position: TrackerReport::new(sender, time, latitude, longitude).position_at(time),
    }
}

// =============================================================================
// Lookup and insert
// =============================================================================

#[tokio::test]
async fn unknown_sender_is_absent() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());

    assert!(store.get_tracker("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn insert_creates_tracker_and_first_footprint() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());

    let id = store
        .insert_tracker(&new_tracker("A", 1_000, 10.5, 20.25))
        .await
        .unwrap();

    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.id, id);
    assert_eq!(tracker.marker_id, Some(MarkerId::new(100)));
    assert_eq!(tracker.position.time, 1_000);
    assert_eq!(tracker.position.latitude, 10.5);
    assert_eq!(tracker.position.longitude, 20.25);

    let footprints = FootprintStore::new(db.pool()).list_footprints(id).await.unwrap();
    assert_eq!(footprints.len(), 1);
    assert!(footprints[0].marker_id.is_none());
}

#[tokio::test]
async fn duplicate_sender_violates_uniqueness() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());

    store.insert_tracker(&new_tracker("A", 1, 0.0, 0.0)).await.unwrap();
    let err = store
        .insert_tracker(&new_tracker("A", 2, 1.0, 1.0))
        .await
        .unwrap_err();

    assert!(err.is_unique_violation(), "unexpected error: {err}");
    assert_eq!(store.list_trackers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn tracker_without_history_is_treated_as_absent() {
    let db = setup().await;
    sqlx::query("INSERT INTO trackers (sender, title) VALUES ('ghost', 'ghost')")
        .execute(db.pool())
        .await
        .unwrap();

    let store = TrackerStore::new(db.pool());
    assert!(store.get_tracker("ghost").await.unwrap().is_none());
    assert!(store.get_tracker_row("ghost").await.unwrap().is_some());
}

// =============================================================================
// Merge
// =============================================================================

#[tokio::test]
async fn update_inserts_unknown_sender_named_after_it() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());

    let outcome = store
        .update_tracker(&TrackerReport::new("B", 7, 1.0, 2.0))
        .await
        .unwrap();

    assert!(outcome.created);
    assert!(outcome.footprint_recorded);
    assert_eq!(outcome.tracker.name, "B");

    let count = FootprintStore::new(db.pool())
        .count_footprints(outcome.tracker.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn newer_report_advances_snapshot_and_records_footprint() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 10, 5.0, 5.0)).await.unwrap();

    let report = TrackerReport::new("A", 20, 6.0, 7.0).with_telemetry(3.5, 90, 4);
    let outcome = store.update_tracker(&report).await.unwrap();

    assert!(!outcome.created);
    assert!(outcome.footprint_recorded);
    assert!(outcome.snapshot_advanced);
    assert_eq!(outcome.tracker.position, report.position_at(20));

    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.position, report.position_at(20));
    assert_eq!(
        FootprintStore::new(db.pool()).count_footprints(id).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn out_of_order_report_is_archived_but_not_displayed() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 10, 5.0, 5.0)).await.unwrap();

    let outcome = store
        .update_tracker(&TrackerReport::new("A", 5, 9.0, 9.0).with_name("Late"))
        .await
        .unwrap();

    assert!(outcome.footprint_recorded);
    assert!(!outcome.snapshot_advanced);
    assert_eq!(outcome.tracker.position.time, 10);
    assert_eq!(outcome.tracker.position.latitude, 5.0);
    assert_eq!(outcome.tracker.name, "A");

    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.position.time, 10);
    assert_eq!(tracker.position.longitude, 5.0);
    assert_eq!(tracker.name, "A");

    let footprints = FootprintStore::new(db.pool()).list_footprints(id).await.unwrap();
    let times: Vec<i64> = footprints.iter().map(|f| f.position.time).collect();
    assert_eq!(times, vec![10, 5]);
}

#[tokio::test]
async fn duplicate_report_records_nothing() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 10, 5.0, 5.0)).await.unwrap();

    let outcome = store
        .update_tracker(&TrackerReport::new("A", 10, 5.0, 5.0))
        .await
        .unwrap();

    assert!(!outcome.footprint_recorded);
    assert!(outcome.snapshot_advanced);
    assert_eq!(outcome.tracker.position.time, 10);
    assert_eq!(
        FootprintStore::new(db.pool()).count_footprints(id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn same_time_new_coordinates_wins_display() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    store.insert_tracker(&new_tracker("A", 10, 5.0, 5.0)).await.unwrap();

    let outcome = store
        .update_tracker(&TrackerReport::new("A", 10, 8.0, 8.0))
        .await
        .unwrap();
    assert!(outcome.footprint_recorded);

    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.position.latitude, 8.0);
}

#[tokio::test]
async fn missing_time_is_stamped_with_now() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    store.insert_tracker(&new_tracker("A", 10, 5.0, 5.0)).await.unwrap();

    let mut report = TrackerReport::new("A", 0, 5.0, 5.0);
    report.time = None;
    let outcome = store.update_tracker_at(&report, 99_000).await.unwrap();

    assert!(outcome.footprint_recorded);
    assert_eq!(outcome.tracker.position.time, 99_000);
}

#[tokio::test]
async fn blank_fields_inherit_stored_values() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    store
        .update_tracker(
            &TrackerReport::new("A", 1, 0.0, 0.0)
                .with_name("Boat")
                .with_icon("anchor")
                .with_marker_id(MarkerId::new(5)),
        )
        .await
        .unwrap();

    store
        .update_tracker(&TrackerReport::new("A", 2, 1.0, 1.0).with_name("").with_icon(""))
        .await
        .unwrap();

    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.name, "Boat");
    assert_eq!(tracker.icon.as_deref(), Some("anchor"));
    assert_eq!(tracker.marker_id, Some(MarkerId::new(5)));
}

#[tokio::test]
async fn display_follows_maximum_time_seen() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());

    let reports = [(3, 3.0), (1, 1.0), (7, 7.0), (5, 5.0), (7, 7.0), (2, 2.0)];
    for (time, coord) in reports {
        store
            .update_tracker(&TrackerReport::new("M", time, coord, coord))
            .await
            .unwrap();
    }

    let tracker = store.get_tracker("M").await.unwrap().unwrap();
    assert_eq!(tracker.position.time, 7);
    assert_eq!(tracker.position.latitude, 7.0);
    // The repeated (7, 7.0) report is the only one that adds nothing.
    assert_eq!(
        FootprintStore::new(db.pool())
            .count_footprints(tracker.id)
            .await
            .unwrap(),
        5
    );
}

// =============================================================================
// Removal and marker links
// =============================================================================

#[tokio::test]
async fn removing_tracker_cascades_to_footprints() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 1, 0.0, 0.0)).await.unwrap();
    for t in 2..5 {
        store
            .update_tracker(&TrackerReport::new("A", t, 0.0, 0.0))
            .await
            .unwrap();
    }

    assert!(store.remove_tracker("A").await.unwrap());
    assert!(!store.remove_tracker("A").await.unwrap());
    assert!(store.get_tracker("A").await.unwrap().is_none());
    assert_eq!(
        FootprintStore::new(db.pool()).count_footprints(id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn footprint_marker_ids_can_be_set_and_cleared() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let footprints = FootprintStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 1, 0.0, 0.0)).await.unwrap();
    store
        .update_tracker(&TrackerReport::new("A", 2, 1.0, 1.0))
        .await
        .unwrap();

    for (n, footprint) in footprints.list_footprints(id).await.unwrap().iter().enumerate() {
        let marker = MarkerId::new(i64::try_from(n).unwrap() + 500);
        assert_eq!(
            footprints
                .set_footprint_marker_id(footprint.id, Some(marker))
                .await
                .unwrap(),
            1
        );
    }
    let linked = footprints.list_footprints(id).await.unwrap();
    assert!(linked.iter().all(|f| f.marker_id.is_some()));

    assert_eq!(footprints.clear_footprint_marker_ids(id).await.unwrap(), 2);
    let cleared = footprints.list_footprints(id).await.unwrap();
    assert!(cleared.iter().all(|f| f.marker_id.is_none()));
}

#[tokio::test]
async fn tracker_marker_id_can_be_replaced() {
    let db = setup().await;
    let store = TrackerStore::new(db.pool());
    let id = store.insert_tracker(&new_tracker("A", 1, 0.0, 0.0)).await.unwrap();

    store
        .set_tracker_marker_id(id, Some(MarkerId::new(9)))
        .await
        .unwrap();
    let tracker = store.get_tracker("A").await.unwrap().unwrap();
    assert_eq!(tracker.marker_id, Some(MarkerId::new(9)));

    assert_eq!(
        store
            .set_tracker_marker_id(TrackerId::new(404), None)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn footprints_of_unknown_tracker_are_rejected() {
    let db = setup().await;
    let result = FootprintStore::new(db.pool())
        .insert_footprint(
            TrackerId::new(404),
            &TrackerReport::new("x", 1, 0.0, 0.0).position_at(1),
        )
        .await;
    assert!(result.is_err());
}

// =============================================================================
// Schema lifecycle
// =============================================================================

#[tokio::test]
async fn prepare_is_idempotent_at_current_version() {
    let db = setup().await;
    assert_eq!(
        tracker_db::schema::user_version(db.pool()).await.unwrap(),
        SCHEMA_VERSION
    );
    assert_eq!(db.prepare_schema().await.unwrap(), SchemaAction::Unchanged);
}

#[tokio::test]
async fn version_change_rebuilds_and_discards_data() {
    let db = setup().await;
    TrackerStore::new(db.pool())
        .insert_tracker(&new_tracker("A", 1, 0.0, 0.0))
        .await
        .unwrap();

    {
        let mut conn = db.pool().acquire().await.unwrap();
        tracker_db::schema::set_user_version(&mut conn, 2)
            .await
            .unwrap();
    }

    assert_eq!(
        db.prepare_schema().await.unwrap(),
        SchemaAction::Rebuilt { from: 2 }
    );
    let store = TrackerStore::new(db.pool());
    assert!(store.list_trackers().await.unwrap().is_empty());
    assert_eq!(
        tracker_db::schema::user_version(db.pool()).await.unwrap(),
        SCHEMA_VERSION
    );
}
