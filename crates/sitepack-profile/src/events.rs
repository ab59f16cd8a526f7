//! Migration journal events
//!
//! Each stage of a confirmed run is recorded as one [`MigrationEvent`],
//! wrapped in a [`JournalEntry`] carrying an id and a timestamp.

use crate::error::Stage;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Migration pipeline events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// Names and environment passed validation
    ValidationPassed { display_name: String },

    /// Package directory and manifest created
    Scaffolded { path: Utf8PathBuf },

    /// Active configuration exported into the package
    ConfigExported { destination: Utf8PathBuf },

    /// Live active extension set switched to the new profile
    RegistrySwitched {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        previous_profile: Option<String>,
        weight: i64,
    },

    /// Snapshot `core.extension` replaced with the live value
    SnapshotReconciled { sync_dir: Utf8PathBuf },

    /// Both invalidation phases ran
    CachesInvalidated,

    /// Settings file points at the new snapshot
    SettingsUpdated { path: Utf8PathBuf },

    /// Settings file must be edited by hand
    SettingsManual { path: Utf8PathBuf, line: String },

    /// The run stopped with an error
    Failed {
        stage: Stage,
        error: String,
        live_state_changed: bool,
    },
}

impl MigrationEvent {
    /// Short event name for tables
    pub fn name(&self) -> &'static str {
        match self {
            MigrationEvent::ValidationPassed { .. } => "validation_passed",
            MigrationEvent::Scaffolded { .. } => "scaffolded",
            MigrationEvent::ConfigExported { .. } => "config_exported",
            MigrationEvent::RegistrySwitched { .. } => "registry_switched",
            MigrationEvent::SnapshotReconciled { .. } => "snapshot_reconciled",
            MigrationEvent::CachesInvalidated => "caches_invalidated",
            MigrationEvent::SettingsUpdated { .. } => "settings_updated",
            MigrationEvent::SettingsManual { .. } => "settings_manual",
            MigrationEvent::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationEvent::ValidationPassed { display_name } => {
                write!(f, "validated '{}'", display_name)
            }
            MigrationEvent::Scaffolded { path } => write!(f, "created {}", path),
            MigrationEvent::ConfigExported { destination } => {
                write!(f, "exported configuration to {}", destination)
            }
            MigrationEvent::RegistrySwitched {
                previous_profile,
                weight,
            } => write!(
                f,
                "switched from {} (weight {})",
                previous_profile.as_deref().unwrap_or("no profile"),
                weight
            ),
            MigrationEvent::SnapshotReconciled { sync_dir } => {
                write!(f, "reconciled core.extension in {}", sync_dir)
            }
            MigrationEvent::CachesInvalidated => write!(f, "caches invalidated"),
            MigrationEvent::SettingsUpdated { path } => write!(f, "updated {}", path),
            MigrationEvent::SettingsManual { path, line } => {
                write!(f, "add '{}' to {}", line, path)
            }
            MigrationEvent::Failed { stage, error, .. } => {
                write!(f, "{} failed: {}", stage, error)
            }
        }
    }
}

/// One journal line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub machine_name: String,
    pub event: MigrationEvent,
}

impl JournalEntry {
    pub fn new(machine_name: impl Into<String>, event: MigrationEvent) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            machine_name: machine_name.into(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = MigrationEvent::Failed {
            stage: Stage::Export,
            error: "boom".to_string(),
            live_state_changed: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["stage"], "export");
    }

    #[test]
    fn test_unit_events_serialize() {
        let entry = JournalEntry::new("my_site", MigrationEvent::CachesInvalidated);
        let line = serde_json::to_string(&entry).unwrap();
        let parsed: JournalEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.event, MigrationEvent::CachesInvalidated);
        assert_eq!(parsed.machine_name, "my_site");
    }

    #[test]
    fn test_absent_previous_profile_is_omitted() {
        let event = MigrationEvent::RegistrySwitched {
            previous_profile: None,
            weight: 2000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("previous_profile"));
        assert_eq!(event.name(), "registry_switched");
    }
}
