//! Migration orchestrator
//!
//! Runs validate → confirm → scaffold → export → activate, then the
//! housekeeping that follows a profile switch. Every collaborator is
//! injected so the pipeline can run against a real site or in-memory
//! fakes.

use crate::error::{MigrationError, ValidationError};
use crate::events::MigrationEvent;
use crate::journal::MigrationJournal;
use crate::package::ProfilePackage;
use crate::registry::ExtensionRegistry;
use crate::settings::{SettingsFile, SettingsOutcome};
use crate::snapshot::SnapshotWriter;
use crate::validator::{normalize_to_identifier, NameValidator};
use camino::{Utf8Path, Utf8PathBuf};
use sitepack_core::types::{ExtensionSet, ProfileSpec};
use sitepack_core::utils::core_major_version;
use sitepack_core::{ConfigStorage, SitepackConfig};
use tracing::{info, warn};

/// Asks the operator to go ahead
#[cfg_attr(test, mockall::automock)]
pub trait Confirmation {
    /// `Ok(false)` means the operator declined; `Err` means asking failed
    fn confirm(&self, prompt: &str) -> Result<bool, String>;
}

/// Confirmation that always accepts (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool, String> {
        Ok(true)
    }
}

/// Names supplied by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRequest {
    pub name: Option<String>,
    pub machine_name: Option<String>,
    pub description: Option<String>,
}

/// Display and machine name after filling in whichever was omitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    pub display_name: String,
    pub machine_name: String,
}

impl MigrationRequest {
    /// Fill in a missing name from the other one
    ///
    /// Only a display name: the machine name is its normalized form.
    /// Only a machine name: it doubles as the display name. Both missing:
    /// both stay empty and validation reports it.
    pub fn resolve(&self) -> ResolvedNames {
        let name = self.name.clone().filter(|n| !n.trim().is_empty());
        let machine_name = self.machine_name.clone().filter(|n| !n.trim().is_empty());

        match (name, machine_name) {
            (Some(display_name), Some(machine_name)) => ResolvedNames {
                display_name,
                machine_name,
            },
            (Some(display_name), None) => ResolvedNames {
                machine_name: normalize_to_identifier(&display_name),
                display_name,
            },
            (None, Some(machine_name)) => ResolvedNames {
                display_name: machine_name.clone(),
                machine_name,
            },
            (None, None) => ResolvedNames {
                display_name: String::new(),
                machine_name: String::new(),
            },
        }
    }
}

/// Site facts the orchestrator needs
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub root: Utf8PathBuf,
    pub profiles_dir: Utf8PathBuf,
    pub core_version: String,
    pub generator: String,
}

impl SiteContext {
    pub fn from_config(config: &SitepackConfig) -> sitepack_core::Result<Self> {
        Ok(Self {
            root: config.root(),
            profiles_dir: config.profiles_dir(),
            core_version: config.core_version()?.to_string(),
            generator: config.generator().to_string(),
        })
    }

    /// Path written to the settings file, relative to the root when possible
    fn settings_path(&self, sync_dir: &Utf8Path) -> String {
        sync_dir
            .strip_prefix(&self.root)
            .unwrap_or(sync_dir)
            .to_string()
    }
}

/// Summary of a completed migration
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub machine_name: String,
    pub display_name: String,
    pub package_root: Utf8PathBuf,
    pub sync_dir: Utf8PathBuf,
    pub previous_profile: Option<String>,
    pub weight: i64,
    pub settings: SettingsOutcome,
    /// Housekeeping problems; the live site has switched regardless
    pub warnings: Vec<String>,
}

/// How a run ended, short of an error
#[derive(Debug, Clone)]
pub enum MigrationOutcome {
    Completed(MigrationReport),
    Cancelled,
}

/// Converts the current site into an installation profile
pub struct MigrationOrchestrator {
    registry: Box<dyn ExtensionRegistry>,
    live: Box<dyn ConfigStorage>,
    snapshot: SnapshotWriter,
    confirmation: Box<dyn Confirmation>,
    settings: SettingsFile,
    journal: Option<MigrationJournal>,
    site: SiteContext,
}

impl MigrationOrchestrator {
    pub fn new(
        registry: Box<dyn ExtensionRegistry>,
        live: Box<dyn ConfigStorage>,
        snapshot: SnapshotWriter,
        confirmation: Box<dyn Confirmation>,
        settings: SettingsFile,
        site: SiteContext,
    ) -> Self {
        Self {
            registry,
            live,
            snapshot,
            confirmation,
            settings,
            journal: None,
            site,
        }
    }

    /// Record pipeline events in `journal`
    pub fn with_journal(mut self, journal: MigrationJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Live configuration store
    pub fn live(&self) -> &dyn ConfigStorage {
        self.live.as_ref()
    }

    fn record(&self, machine_name: &str, event: MigrationEvent) {
        if let Some(journal) = &self.journal {
            journal.record(machine_name, event);
        }
    }

    /// Validate without confirming or changing anything
    pub fn check(
        &mut self,
        request: &MigrationRequest,
    ) -> Result<ResolvedNames, ValidationError> {
        let names = request.resolve();
        NameValidator::new(
            self.registry.as_mut(),
            self.live.as_ref(),
            &self.site.profiles_dir,
        )
        .validate(&names.display_name, &names.machine_name)?;
        Ok(names)
    }

    /// Run the whole migration
    ///
    /// Nothing is journaled until the operator confirms, so a declined or
    /// rejected run leaves the site exactly as it was.
    pub fn run(
        &mut self,
        request: &MigrationRequest,
    ) -> Result<MigrationOutcome, MigrationError> {
        let names = request.resolve();
        let result = self.execute(request, &names);

        if let Err(e) = &result {
            if e.stage().writes_site() {
                self.record(
                    &names.machine_name,
                    MigrationEvent::Failed {
                        stage: e.stage(),
                        error: e.to_string(),
                        live_state_changed: e.live_state_changed(),
                    },
                );
            }
        }
        result
    }

    fn execute(
        &mut self,
        request: &MigrationRequest,
        names: &ResolvedNames,
    ) -> Result<MigrationOutcome, MigrationError> {
        let core_major =
            core_major_version(&self.site.core_version).map_err(MigrationError::Context)?;

        self.check(request)?;

        let previous_profile = ExtensionSet::read_from(self.live.as_ref())
            .map_err(MigrationError::Context)?
            .and_then(|set| set.profile);

        let prompt = format!(
            "Generate profile '{}' from this site and make it the active profile?",
            names.machine_name
        );
        if !self
            .confirmation
            .confirm(&prompt)
            .map_err(MigrationError::Confirmation)?
        {
            info!("Profile generation cancelled");
            return Ok(MigrationOutcome::Cancelled);
        }
        self.record(
            &names.machine_name,
            MigrationEvent::ValidationPassed {
                display_name: names.display_name.clone(),
            },
        );

        let spec = ProfileSpec::new(
            &names.machine_name,
            &names.display_name,
            request.description.clone().unwrap_or_default(),
        );

        let package = ProfilePackage::scaffold(spec, &self.site.profiles_dir, core_major)?;
        self.record(
            &names.machine_name,
            MigrationEvent::Scaffolded {
                path: package.layout().root().to_owned(),
            },
        );

        let package = package.export_configuration(&self.snapshot)?;
        self.record(
            &names.machine_name,
            MigrationEvent::ConfigExported {
                destination: package.layout().sync_dir(),
            },
        );

        let package = package.activate(
            self.live.as_mut(),
            previous_profile.as_deref(),
            &self.site.generator,
        )?;
        let sync_dir = package.layout().sync_dir();
        self.record(
            &names.machine_name,
            MigrationEvent::RegistrySwitched {
                previous_profile: previous_profile.clone(),
                weight: package.weight(),
            },
        );
        self.record(
            &names.machine_name,
            MigrationEvent::SnapshotReconciled {
                sync_dir: sync_dir.clone(),
            },
        );

        let mut warnings = Vec::new();

        if let Err(e) = self.registry.invalidate_all() {
            warn!("Cache invalidation failed: {}", e);
            warnings.push(format!("Cache invalidation failed: {}", e));
        } else {
            self.record(&names.machine_name, MigrationEvent::CachesInvalidated);
        }

        let settings = self
            .settings
            .point_sync_directory(&self.site.settings_path(&sync_dir));
        match &settings {
            SettingsOutcome::Updated { path } => self.record(
                &names.machine_name,
                MigrationEvent::SettingsUpdated { path: path.clone() },
            ),
            SettingsOutcome::Manual { path, line, reason } => {
                warnings.push(format!(
                    "Could not update {} ({}); add this line by hand: {}",
                    path, reason, line
                ));
                self.record(
                    &names.machine_name,
                    MigrationEvent::SettingsManual {
                        path: path.clone(),
                        line: line.clone(),
                    },
                );
            }
        }

        info!("Profile '{}' is now the active profile", names.machine_name);
        Ok(MigrationOutcome::Completed(MigrationReport {
            machine_name: names.machine_name.clone(),
            display_name: names.display_name.clone(),
            package_root: package.layout().root().to_owned(),
            sync_dir,
            previous_profile,
            weight: package.weight(),
            settings,
            warnings,
        }))
    }
}
