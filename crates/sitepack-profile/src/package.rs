//! Profile package: directory layout and the scaffold → export → activate
//! sequence
//!
//! The sequence is encoded in the type: a package is created
//! [`Scaffolded`], becomes [`Exported`] once the configuration snapshot has
//! been written, and only an exported package can be activated. A failing
//! step consumes the package and returns the error; nothing is rolled back.
//!
//! ```text
//! profiles/<machine_name>/
//! ├── <machine_name>.info.yml
//! └── config/
//!     └── sync/
//!         ├── core.extension.yml
//!         └── ...
//! ```

use crate::error::{ActivationError, ExportError, ScaffoldError, ScaffoldStep};
use crate::snapshot::SnapshotWriter;
use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use sitepack_core::types::{
    ExtensionSet, InfoFile, ProfileSpec, EXTENSION_SET_DOCUMENT, INFO_FILE_SUFFIX,
};
use sitepack_core::{ConfigStorage, FileStorage};
use std::fs;
use tracing::{debug, info};

/// Snapshot directory inside a package
pub const SYNC_DIR: &str = "config/sync";

/// Weight added on top of the highest active weight so the profile loads last
pub const PROFILE_WEIGHT_INCREMENT: i64 = 1000;

/// Paths of a profile package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: Utf8PathBuf,
    machine_name: String,
}

impl PackageLayout {
    pub fn new(profiles_dir: &Utf8Path, machine_name: &str) -> Self {
        Self {
            root: profiles_dir.join(machine_name),
            machine_name: machine_name.to_string(),
        }
    }

    /// Package root, `profiles/<machine_name>`
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// `<machine_name>.info.yml`
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root
            .join(format!("{}{}", self.machine_name, INFO_FILE_SUFFIX))
    }

    /// `config/sync`
    pub fn sync_dir(&self) -> Utf8PathBuf {
        self.root.join(SYNC_DIR)
    }
}

/// Directory laid out, manifest written
#[derive(Debug)]
pub struct Scaffolded;

/// Configuration snapshot exported
#[derive(Debug)]
pub struct Exported;

/// Live site switched and snapshot reconciled
#[derive(Debug)]
pub struct Activated {
    /// `core.extension` as persisted to the live store
    persisted: Value,
    /// Weight assigned to the new profile
    weight: i64,
    /// Profile that was replaced
    previous_profile: Option<String>,
}

/// A profile package in state `S`
#[derive(Debug)]
pub struct ProfilePackage<S> {
    spec: ProfileSpec,
    layout: PackageLayout,
    state: S,
}

impl<S> ProfilePackage<S> {
    pub fn spec(&self) -> &ProfileSpec {
        &self.spec
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }
}

impl ProfilePackage<Scaffolded> {
    /// Create the package directory, its manifest and `config/sync/`
    ///
    /// The package root is created non-recursively, so an existing
    /// directory of the same name is an error rather than something to
    /// write into.
    pub fn scaffold(
        spec: ProfileSpec,
        profiles_dir: &Utf8Path,
        core_major_version: u64,
    ) -> Result<Self, ScaffoldError> {
        let layout = PackageLayout::new(profiles_dir, spec.machine_name());

        fs::create_dir(layout.root())
            .map_err(|e| ScaffoldError::new(ScaffoldStep::CreateRoot, layout.root(), e))?;

        let manifest_path = layout.manifest_path();
        let manifest = InfoFile::profile(
            spec.display_name(),
            spec.description(),
            core_major_version,
        );
        let content = serde_yaml_ng::to_string(&manifest)
            .map_err(|e| ScaffoldError::new(ScaffoldStep::WriteManifest, &manifest_path, e))?;
        fs::write(&manifest_path, content)
            .map_err(|e| ScaffoldError::new(ScaffoldStep::WriteManifest, &manifest_path, e))?;

        let sync_dir = layout.sync_dir();
        fs::create_dir_all(&sync_dir)
            .map_err(|e| ScaffoldError::new(ScaffoldStep::CreateSyncDirectory, &sync_dir, e))?;

        info!("Created profile package at {}", layout.root());
        Ok(Self {
            spec,
            layout,
            state: Scaffolded,
        })
    }

    /// Export the full active configuration into `config/sync/`
    pub fn export_configuration(
        self,
        writer: &SnapshotWriter,
    ) -> Result<ProfilePackage<Exported>, ExportError> {
        writer.export_all(&self.layout.sync_dir())?;
        info!("Exported configuration to {}", self.layout.sync_dir());
        Ok(ProfilePackage {
            spec: self.spec,
            layout: self.layout,
            state: Exported,
        })
    }
}

impl ProfilePackage<Exported> {
    /// Make this package the site's profile
    ///
    /// Two commits, in order:
    /// 1. the new active extension set is persisted to the live store
    ///    (profile switched, generator and previous profile removed, this
    ///    profile added at the highest weight + 1000);
    /// 2. the value read back from the live store replaces
    ///    `core.extension` in the snapshot, which still holds the
    ///    pre-migration set from the export.
    ///
    /// A failure in (1) leaves the live site untouched. A failure in (2)
    /// leaves the live site switched and the snapshot stale, reported as
    /// [`ActivationError::SnapshotReconcile`].
    pub fn activate(
        self,
        live: &mut dyn ConfigStorage,
        previous_profile: Option<&str>,
        generator: &str,
    ) -> Result<ProfilePackage<Activated>, ActivationError> {
        self.check_complete()?;

        let machine_name = self.spec.machine_name().to_string();

        let mut set = ExtensionSet::read_from(live)
            .map_err(|e| ActivationError::ReadLive {
                message: e.to_string(),
            })?
            .ok_or_else(|| ActivationError::ReadLive {
                message: format!(
                    "{} does not exist in {}",
                    EXTENSION_SET_DOCUMENT,
                    live.location()
                ),
            })?;

        let highest = set.highest_weight();
        let weight = highest + PROFILE_WEIGHT_INCREMENT;
        debug!("Highest active weight is {}, assigning {}", highest, weight);

        set.profile = Some(machine_name.clone());
        set.module.remove(generator);
        if let Some(previous) = previous_profile {
            set.module.remove(previous);
        }
        set.module.insert(machine_name.clone(), weight);

        let value = set.to_value().map_err(|e| ActivationError::RegistryWrite {
            profile: machine_name.clone(),
            message: e.to_string(),
        })?;
        live.write(EXTENSION_SET_DOCUMENT, &value)
            .map_err(|e| ActivationError::RegistryWrite {
                profile: machine_name.clone(),
                message: e.to_string(),
            })?;
        info!(
            "Switched active profile from {} to {}",
            previous_profile.unwrap_or("(none)"),
            machine_name
        );

        // From here on the live site has switched
        let sync_dir = self.layout.sync_dir();
        let reconcile_error = |message: String| ActivationError::SnapshotReconcile {
            profile: machine_name.clone(),
            document: EXTENSION_SET_DOCUMENT.to_string(),
            sync_dir: sync_dir.clone(),
            message,
        };

        let persisted = live
            .read(EXTENSION_SET_DOCUMENT)
            .map_err(|e| reconcile_error(e.to_string()))?
            .ok_or_else(|| reconcile_error("persisted value could not be read back".to_string()))?;

        let mut snapshot = FileStorage::new(&sync_dir);
        snapshot
            .write(EXTENSION_SET_DOCUMENT, &persisted)
            .map_err(|e| reconcile_error(e.to_string()))?;
        info!("Reconciled {} in {}", EXTENSION_SET_DOCUMENT, sync_dir);

        Ok(ProfilePackage {
            spec: self.spec,
            layout: self.layout,
            state: Activated {
                persisted,
                weight,
                previous_profile: previous_profile.map(str::to_string),
            },
        })
    }

    fn check_complete(&self) -> Result<(), ActivationError> {
        let manifest = self.layout.manifest_path();
        if !manifest.is_file() {
            return Err(ActivationError::PackageIncomplete {
                path: self.layout.root().to_owned(),
                missing: manifest.to_string(),
            });
        }
        let sync_dir = self.layout.sync_dir();
        if !sync_dir.is_dir() {
            return Err(ActivationError::PackageIncomplete {
                path: self.layout.root().to_owned(),
                missing: sync_dir.to_string(),
            });
        }
        Ok(())
    }
}

impl ProfilePackage<Activated> {
    /// `core.extension` as persisted to the live store and the snapshot
    pub fn persisted(&self) -> &Value {
        &self.state.persisted
    }

    /// Weight assigned to the new profile
    pub fn weight(&self) -> i64 {
        self.state.weight
    }

    pub fn previous_profile(&self) -> Option<&str> {
        self.state.previous_profile.as_deref()
    }
}
