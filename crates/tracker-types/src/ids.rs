//! Type-safe identifier wrappers around `i64` row ids.
//!
//! Trackers and footprints are keyed by `SQLite` integer primary keys, and
//! map markers by ids assigned by the host map application. Wrapping each in
//! its own newtype prevents passing a footprint id where a marker id is
//! expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner `i64` value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Local identifier of a tracker row.
    TrackerId
}

define_id! {
    /// Local identifier of a footprint (history point) row.
    FootprintId
}

define_id! {
    /// Identifier of a marker, assigned by the host map application.
    MarkerId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&MarkerId::new(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: TrackerId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, TrackerId::new(7));
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(FootprintId::new(-3).to_string(), "-3");
        assert_eq!(i64::from(MarkerId::from(9)), 9);
    }
}
