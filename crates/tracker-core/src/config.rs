//! Configuration loading and typed config structures.
//!
//! The configuration is a small YAML file. Every field has a default, so an
//! empty document is valid. Marker settings are read once when the
//! reconciler is constructed.
//!
//! ```yaml
//! markers:
//!   color: 4278190335
//!   footprint_trail_length: 5
//!   label_time_format: "%H:%M"
//! database:
//!   url: "sqlite://tracker.db"
//!   max_connections: 1
//! logging:
//!   level: "info"
//! ```

use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use tracker_db::SqliteConfig;

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "TRACKER_DATABASE_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The marker label time format is not a valid strftime string.
    #[error("invalid label time format: {format:?}")]
    InvalidTimeFormat {
        /// The rejected format string.
        format: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackerConfig {
    /// How trackers and footprints are drawn on the host map.
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Where the tracker database lives.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrackerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `TRACKER_DATABASE_URL` overrides `database.url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidTimeFormat`] if the label format is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.database.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidTimeFormat`] if the label format is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.markers.validate()?;
        Ok(config)
    }
}

/// Marker appearance and footprint trail settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerConfig {
    /// Marker background color as ARGB.
    #[serde(default = "default_marker_color")]
    pub color: u32,

    /// Number of footprints mirrored behind each tracker. Zero disables
    /// the trail.
    #[serde(default = "default_footprint_trail_length")]
    pub footprint_trail_length: u32,

    /// strftime format for the time shown in footprint labels, rendered
    /// in the local timezone.
    #[serde(default = "default_label_time_format")]
    pub label_time_format: String,
}

impl MarkerConfig {
    /// Check that the label time format parses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeFormat`] if it does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = StrftimeItems::new(&self.label_time_format)
            .any(|item| matches!(item, Item::Error));
        if invalid {
            return Err(ConfigError::InvalidTimeFormat {
                format: self.label_time_format.clone(),
            });
        }
        Ok(())
    }

    /// Set the trail length.
    #[must_use]
    pub const fn with_trail_length(mut self, length: u32) -> Self {
        self.footprint_trail_length = length;
        self
    }

    /// Set the marker color.
    #[must_use]
    pub const fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            color: default_marker_color(),
            footprint_trail_length: default_footprint_trail_length(),
            label_time_format: default_label_time_format(),
        }
    }
}

/// Database location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections. Keep at one for a single writer.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Override the URL with `TRACKER_DATABASE_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override the URL from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.url = url;
        }
    }

    /// Pool configuration for [`tracker_db::TrackerDb::open`].
    pub fn to_sqlite_config(&self) -> SqliteConfig {
        SqliteConfig::new(&self.url).with_max_connections(self.max_connections)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Opaque blue.
const fn default_marker_color() -> u32 {
    0xFF00_00FF
}

const fn default_footprint_trail_length() -> u32 {
    5
}

fn default_label_time_format() -> String {
    "%H:%M".to_owned()
}

fn default_database_url() -> String {
    tracker_db::sqlite::DEFAULT_DATABASE_URL.to_owned()
}

const fn default_max_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = TrackerConfig::parse("{}").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.markers.color, 0xFF00_00FF);
        assert_eq!(config.markers.footprint_trail_length, 5);
        assert_eq!(config.database.url, "sqlite://tracker.db");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
markers:
  color: 4294901760
  footprint_trail_length: 12
  label_time_format: "%d.%m %H:%M"
database:
  url: "sqlite:///data/tracker.db"
  max_connections: 2
logging:
  level: "debug"
"#;
        let config = TrackerConfig::parse(yaml).unwrap();
        assert_eq!(config.markers.color, 0xFFFF_0000);
        assert_eq!(config.markers.footprint_trail_length, 12);
        assert_eq!(config.markers.label_time_format, "%d.%m %H:%M");
        assert_eq!(config.database.url, "sqlite:///data/tracker.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = TrackerConfig::parse("markers:\n  footprint_trail_length: 0\n").unwrap();
        assert_eq!(config.markers.footprint_trail_length, 0);
        assert_eq!(config.markers.color, 0xFF00_00FF);
        assert_eq!(config.markers.label_time_format, "%H:%M");
    }

    #[test]
    fn invalid_time_format_is_rejected() {
        let result = TrackerConfig::parse("markers:\n  label_time_format: \"%Q\"\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn negative_trail_length_is_rejected() {
        let result = TrackerConfig::parse("markers:\n  footprint_trail_length: -1\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn database_url_override() {
        let mut db = DatabaseConfig::default();
        db.apply_overrides(|key| (key == DATABASE_URL_ENV).then(|| "sqlite::memory:".to_owned()));
        assert_eq!(db.url, "sqlite::memory:");

        let mut untouched = DatabaseConfig::default();
        untouched.apply_overrides(|_| None);
        assert_eq!(untouched, DatabaseConfig::default());
    }
}
