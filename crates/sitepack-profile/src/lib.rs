//! # sitepack-profile
//!
//! Turns a running site into an installation profile:
//! - Machine name normalization and migration preconditions
//! - Extension discovery with two-phase cache invalidation
//! - Profile package scaffolding, configuration export and activation
//! - Settings update and the migration journal
//!
//! [`MigrationOrchestrator`] ties these together:
//!
//! ```text
//! validate → confirm → scaffold → export → activate → housekeeping
//! ```

pub mod error;
pub mod events;
pub mod journal;
pub mod migration;
pub mod package;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod validator;

pub use error::{
    ActivationError, ExportError, MigrationError, ScaffoldError, Stage, ValidationError,
};
pub use events::{JournalEntry, MigrationEvent};
pub use journal::MigrationJournal;
pub use migration::{
    AssumeYes, Confirmation, MigrationOrchestrator, MigrationOutcome, MigrationReport,
    MigrationRequest, ResolvedNames, SiteContext,
};
pub use package::{Activated, Exported, PackageLayout, ProfilePackage, Scaffolded};
pub use registry::{ExtensionRegistry, InvalidationPhase, SiteRegistry};
pub use settings::{SettingsFile, SettingsOutcome};
pub use snapshot::{CommandExport, ConfigExport, ExportOutcome, SnapshotWriter, StorageExport};
pub use validator::{normalize_to_identifier, NameValidator};
