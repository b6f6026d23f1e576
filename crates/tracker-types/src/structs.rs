//! Core entity structs: trackers, footprints, incoming reports, and markers.

use serde::{Deserialize, Serialize};

use crate::ids::{FootprintId, MarkerId, TrackerId};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A single position fix with the telemetry reported alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed as reported by the device.
    pub speed: f32,
    /// Battery level as reported by the device.
    pub battery: i32,
    /// Signal level as reported by the device.
    pub signal: i32,
    /// Fix time in milliseconds since the Unix epoch.
    pub time: i64,
}

impl Position {
    /// Whether `other` is a different fix.
    ///
    /// Two fixes differ when their time, latitude, or longitude differ.
    /// Coordinates are compared bitwise, with no tolerance.
    pub const fn differs_from(&self, other: &Self) -> bool {
        self.time != other.time
            || self.latitude.to_bits() != other.latitude.to_bits()
            || self.longitude.to_bits() != other.longitude.to_bits()
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// A tracked sender with its latest known position.
///
/// The position is not stored on the tracker row; it is read from the most
/// recent footprint belonging to the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    /// Local row id.
    pub id: TrackerId,
    /// Marker mirroring this tracker on the host map, if one exists.
    pub marker_id: Option<MarkerId>,
    /// Display name.
    pub name: String,
    /// Icon reference understood by the host map.
    pub icon: Option<String>,
    /// Device identifier (IMEI).
    pub imei: Option<String>,
    /// Sender address; unique across trackers.
    pub sender: String,
    /// Latest known position.
    pub position: Position,
}

/// A tracker that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTracker {
    /// Marker mirroring this tracker on the host map, if one exists.
    pub marker_id: Option<MarkerId>,
    /// Display name.
    pub name: String,
    /// Icon reference understood by the host map.
    pub icon: Option<String>,
    /// Device identifier (IMEI).
    pub imei: Option<String>,
    /// Sender address.
    pub sender: String,
    /// First known position.
    pub position: Position,
}

impl NewTracker {
    /// Build the row for a sender seen for the first time.
    ///
    /// The name defaults to the sender when the report has none.
    pub fn from_report(report: &TrackerReport, position: Position) -> Self {
        Self {
            marker_id: report.marker_id,
            name: report.display_name().unwrap_or(&report.sender).to_owned(),
            icon: report.display_icon().map(str::to_owned),
            imei: report.imei.clone(),
            sender: report.sender.clone(),
            position,
        }
    }

    /// Attach the row id assigned on insert.
    pub fn into_tracker(self, id: TrackerId) -> Tracker {
        Tracker {
            id,
            marker_id: self.marker_id,
            name: self.name,
            icon: self.icon,
            imei: self.imei,
            sender: self.sender,
            position: self.position,
        }
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// One archived position sample of a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Local row id.
    pub id: FootprintId,
    /// Owning tracker.
    pub tracker_id: TrackerId,
    /// Marker mirroring this footprint on the host map, if one exists.
    pub marker_id: Option<MarkerId>,
    /// The archived position.
    pub position: Position,
}

// ---------------------------------------------------------------------------
// TrackerReport
// ---------------------------------------------------------------------------

/// A position report received from a remote sender.
///
/// Optional descriptive fields that are missing or blank inherit the stored
/// tracker's values when the report is merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerReport {
    /// Sender address, used as the merge key.
    pub sender: String,
    /// Fix time in epoch milliseconds. Missing or zero means "now".
    #[serde(default)]
    pub time: Option<i64>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Ground speed.
    #[serde(default)]
    pub speed: f32,
    /// Battery level.
    #[serde(default)]
    pub battery: i32,
    /// Signal level.
    #[serde(default)]
    pub signal: i32,
    /// Device identifier (IMEI).
    #[serde(default)]
    pub imei: Option<String>,
    /// Display name chosen by the user.
    #[serde(default)]
    pub name: Option<String>,
    /// Icon reference chosen by the user.
    #[serde(default)]
    pub icon: Option<String>,
    /// Marker id hint from the host map.
    #[serde(default)]
    pub marker_id: Option<MarkerId>,
}

impl TrackerReport {
    /// Create a bare report with no telemetry or descriptive fields.
    pub fn new(sender: &str, time: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            sender: sender.to_owned(),
            time: Some(time),
            latitude,
            longitude,
            speed: 0.0,
            battery: 0,
            signal: 0,
            imei: None,
            name: None,
            icon: None,
            marker_id: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Set the icon reference.
    #[must_use]
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_owned());
        self
    }

    /// Set the device identifier.
    #[must_use]
    pub fn with_imei(mut self, imei: &str) -> Self {
        self.imei = Some(imei.to_owned());
        self
    }

    /// Set the marker id hint.
    #[must_use]
    pub const fn with_marker_id(mut self, marker_id: MarkerId) -> Self {
        self.marker_id = Some(marker_id);
        self
    }

    /// Set speed, battery, and signal.
    #[must_use]
    pub const fn with_telemetry(mut self, speed: f32, battery: i32, signal: i32) -> Self {
        self.speed = speed;
        self.battery = battery;
        self.signal = signal;
        self
    }

    /// The report time, or `now` when the report carries none.
    pub fn time_or(&self, now: i64) -> i64 {
        self.time.filter(|t| *t != 0).unwrap_or(now)
    }

    /// The reported position, stamped with `time`.
    pub const fn position_at(&self, time: i64) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            speed: self.speed,
            battery: self.battery,
            signal: self.signal,
            time,
        }
    }

    /// The display name, if present and not blank.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// The icon reference, if present and not blank.
    pub fn display_icon(&self) -> Option<&str> {
        non_blank(self.icon.as_deref())
    }
}

/// Treat an empty string the same as a missing value.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// A point to render on the host map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Text shown next to the point.
    pub label: String,
    /// Icon reference, if any.
    pub icon: Option<String>,
    /// Background color as ARGB.
    pub color: u32,
}
