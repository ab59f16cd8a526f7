//! Error taxonomy of the migration pipeline
//!
//! | Error            | Live state                         | Remedy                         |
//! |------------------|------------------------------------|--------------------------------|
//! | `Validation`     | untouched                          | fix input/environment, re-run  |
//! | `Scaffold`       | untouched (package dir may exist)  | remove package dir, re-run     |
//! | `Export`         | untouched                          | fix cause, remove dir, re-run  |
//! | `Activation`     | untouched or switched, see variant | see variant                    |

use camino::Utf8PathBuf;
use sitepack_core::types::ExtensionKind;
use thiserror::Error;

/// An installable unit living inside the active profile's directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignExtension {
    pub name: String,
    pub kind: ExtensionKind,
    pub path: Utf8PathBuf,
}

fn list_units(extensions: &[ForeignExtension]) -> String {
    extensions
        .iter()
        .map(|e| format!("{} {}", e.kind, e.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Precondition failures; nothing has been modified
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The active profile owns other modules or themes
    #[error(
        "The current profile '{profile}' ({path}) contains other extensions: {}. \
         It is not possible to generate a new profile from this site",
        list_units(.extensions)
    )]
    ForeignExtensions {
        profile: String,
        path: Utf8PathBuf,
        extensions: Vec<ForeignExtension>,
    },

    /// The active profile is recorded but cannot be located
    #[error("The current profile '{profile}' could not be found in the extension registry")]
    UnknownActiveProfile { profile: String },

    /// An enabled unit has no info file anywhere under the root
    #[error(
        "The enabled {kind} '{name}' could not be found on disk, so it is not possible \
         to tell whether the current profile contains it"
    )]
    ActiveExtensionMissing { name: String, kind: ExtensionKind },

    /// Neither a display name nor a machine name was provided
    #[error("A name or a machine name for the new profile is required")]
    MissingName,

    /// The machine name contains characters an identifier cannot
    #[error(
        "Invalid machine name '{machine_name}': it can only contain lowercase letters, \
         numbers and single underscores (did you mean '{suggestion}'?)"
    )]
    InvalidMachineName {
        machine_name: String,
        suggestion: String,
    },

    /// The machine name identifies an existing unit
    #[error("The machine name '{machine_name}' already exists ({kind} at {path})")]
    MachineNameTaken {
        machine_name: String,
        kind: ExtensionKind,
        path: Utf8PathBuf,
    },

    /// New profiles cannot be created
    #[error("Can not write to the {directory} directory")]
    ProfilesDirNotWritable { directory: Utf8PathBuf },

    /// Live state needed for validation could not be read
    #[error("Could not read site state: {0}")]
    SiteState(#[from] sitepack_core::Error),
}

/// Sub-step of scaffolding that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldStep {
    CreateRoot,
    WriteManifest,
    CreateSyncDirectory,
}

impl std::fmt::Display for ScaffoldStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaffoldStep::CreateRoot => write!(f, "create profile directory"),
            ScaffoldStep::WriteManifest => write!(f, "write manifest"),
            ScaffoldStep::CreateSyncDirectory => write!(f, "create config/sync directory"),
        }
    }
}

/// The package directory could not be laid out
#[derive(Error, Debug)]
#[error("Could not {step} at {path}: {message}")]
pub struct ScaffoldError {
    pub step: ScaffoldStep,
    pub path: Utf8PathBuf,
    pub message: String,
}

impl ScaffoldError {
    pub fn new(step: ScaffoldStep, path: impl Into<Utf8PathBuf>, message: impl ToString) -> Self {
        Self {
            step,
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// The configuration export failed; the live site is unchanged
#[derive(Error, Debug)]
#[error("Could not export active configuration to {destination}: {diagnostics}")]
pub struct ExportError {
    pub destination: Utf8PathBuf,
    pub diagnostics: String,
}

/// Activation failures
#[derive(Error, Debug)]
pub enum ActivationError {
    /// The package is missing its manifest or snapshot directory
    #[error("Profile package at {path} is incomplete: {missing} is missing")]
    PackageIncomplete { path: Utf8PathBuf, missing: String },

    /// The live active extension set could not be read
    #[error("Could not read the active extension set: {message}")]
    ReadLive { message: String },

    /// Persisting the new active extension set failed; the live site is unchanged
    #[error("Could not switch the site to profile '{profile}': {message}")]
    RegistryWrite { profile: String, message: String },

    /// The live site switched but the snapshot still holds the old set
    #[error(
        "The running site has switched to profile '{profile}', but the exported package \
         does not reflect that switch: could not write {document} to {sync_dir}: {message}"
    )]
    SnapshotReconcile {
        profile: String,
        document: String,
        sync_dir: Utf8PathBuf,
        message: String,
    },
}

impl ActivationError {
    /// Whether the live site has already been switched to the new profile
    pub fn live_state_changed(&self) -> bool {
        matches!(self, ActivationError::SnapshotReconcile { .. })
    }
}

/// Pipeline stage, used for journaling failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Confirm,
    Scaffold,
    Export,
    Activate,
}

impl Stage {
    /// Whether the stage runs after confirmation and may write to the site
    pub fn writes_site(&self) -> bool {
        matches!(self, Stage::Scaffold | Stage::Export | Stage::Activate)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Confirm => "confirm",
            Stage::Scaffold => "scaffold",
            Stage::Export => "export",
            Stage::Activate => "activate",
        };
        write!(f, "{}", name)
    }
}

/// Any failure of a migration run
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Activation(#[from] ActivationError),

    /// The confirmation prompt itself failed
    #[error("Could not ask for confirmation: {0}")]
    Confirmation(String),

    /// Site state needed before starting could not be read
    #[error("Could not read site state: {0}")]
    Context(#[source] sitepack_core::Error),
}

impl MigrationError {
    /// Stage the error was raised in
    pub fn stage(&self) -> Stage {
        match self {
            MigrationError::Validation(_) | MigrationError::Context(_) => Stage::Validate,
            MigrationError::Confirmation(_) => Stage::Confirm,
            MigrationError::Scaffold(_) => Stage::Scaffold,
            MigrationError::Export(_) => Stage::Export,
            MigrationError::Activation(_) => Stage::Activate,
        }
    }

    /// Whether the live site was modified before the failure
    pub fn live_state_changed(&self) -> bool {
        match self {
            MigrationError::Activation(e) => e.live_state_changed(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_extensions_message_lists_units() {
        let err = ValidationError::ForeignExtensions {
            profile: "standard".to_string(),
            path: Utf8PathBuf::from("profiles/standard"),
            extensions: vec![
                ForeignExtension {
                    name: "bundled".to_string(),
                    kind: ExtensionKind::Module,
                    path: Utf8PathBuf::from("profiles/standard/modules/bundled"),
                },
                ForeignExtension {
                    name: "skin".to_string(),
                    kind: ExtensionKind::Theme,
                    path: Utf8PathBuf::from("profiles/standard/themes/skin"),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("module bundled, theme skin"));
        assert!(message.contains("profiles/standard"));
    }

    #[test]
    fn test_only_reconcile_failure_changes_live_state() {
        let reconcile = MigrationError::from(ActivationError::SnapshotReconcile {
            profile: "my_site".to_string(),
            document: "core.extension".to_string(),
            sync_dir: Utf8PathBuf::from("profiles/my_site/config/sync"),
            message: "read-only file system".to_string(),
        });
        assert!(reconcile.live_state_changed());
        assert_eq!(reconcile.stage(), Stage::Activate);

        let write = MigrationError::from(ActivationError::RegistryWrite {
            profile: "my_site".to_string(),
            message: "disk full".to_string(),
        });
        assert!(!write.live_state_changed());

        let export = MigrationError::from(ExportError {
            destination: Utf8PathBuf::from("x"),
            diagnostics: "boom".to_string(),
        });
        assert!(!export.live_state_changed());
        assert_eq!(export.stage(), Stage::Export);
    }

    #[test]
    fn test_only_confirmed_stages_write_the_site() {
        assert!(!MigrationError::from(ValidationError::MissingName)
            .stage()
            .writes_site());
        assert!(!MigrationError::Confirmation("no tty".to_string())
            .stage()
            .writes_site());
        assert!(Stage::Scaffold.writes_site());
        assert!(Stage::Activate.writes_site());
    }
}
