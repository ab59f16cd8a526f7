//! Temporary site fixtures
//!
//! A [`TestSite`] is a throwaway application root laid out like a real
//! one: units under `core/`, `modules/` and `themes/`, an empty
//! `profiles/` directory, a live configuration store under
//! `sites/default/config/active` and a settings file.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use sitepack_core::types::{ExtensionSet, EXTENSION_SET_DOCUMENT, INFO_FILE_SUFFIX};
use sitepack_core::{ConfigStorage, FileStorage};
use sitepack_profile::{
    Confirmation, ConfigExport, MigrationJournal, MigrationOrchestrator, SettingsFile,
    SiteContext, SiteRegistry, SnapshotWriter, StorageExport,
};
use std::fs;
use tempfile::TempDir;

pub const GENERATOR: &str = "profile_generator";
pub const CORE_VERSION: &str = "10.3.1";

/// Active set of a freshly installed "standard" site
pub const STANDARD_EXTENSION_SET: &str = r#"
module:
  node: 0
  system: 0
  views: 10
  profile_generator: 0
  standard: 1000
theme:
  olivero: 0
profile: standard
"#;

pub struct TestSite {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl TestSite {
    /// Empty layout: no units, no active set
    pub fn empty() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("profiles")).unwrap();
        fs::create_dir_all(root.join("sites/default/config/active")).unwrap();
        fs::write(root.join("sites/default/settings.yml"), "hash_salt: test\n").unwrap();
        Self { _temp: temp, root }
    }

    /// A site installed from the "standard" profile
    pub fn standard() -> Self {
        Self::empty()
            .with_unit("core/modules/node", "node", "module")
            .with_unit("core/modules/system", "system", "module")
            .with_unit("modules/contrib/views", "views", "module")
            .with_unit("modules/contrib/profile_generator", GENERATOR, "module")
            .with_unit("core/themes/olivero", "olivero", "theme")
            .with_unit("core/profiles/standard", "standard", "profile")
            .with_active_set(STANDARD_EXTENSION_SET)
            .with_document("system.site", "name: Example\nslogan: ''\n")
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn profiles_dir(&self) -> Utf8PathBuf {
        self.root.join("profiles")
    }

    pub fn active_config_dir(&self) -> Utf8PathBuf {
        self.root.join("sites/default/config/active")
    }

    pub fn settings_path(&self) -> Utf8PathBuf {
        self.root.join("sites/default/settings.yml")
    }

    /// Write `<dir>/<name>.info.yml`
    pub fn with_unit(self, dir: &str, name: &str, kind: &str) -> Self {
        let path = self.root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(format!("{}{}", name, INFO_FILE_SUFFIX)),
            format!("name: {}\ntype: {}\ncore_version_requirement: '>=10'\n", name, kind),
        )
        .unwrap();
        self
    }

    pub fn with_active_set(self, yaml: &str) -> Self {
        self.with_document(EXTENSION_SET_DOCUMENT, yaml)
    }

    pub fn with_document(self, name: &str, yaml: &str) -> Self {
        let value: Value = serde_yaml_ng::from_str(yaml).unwrap();
        self.live().write(name, &value).unwrap();
        self
    }

    pub fn live(&self) -> FileStorage {
        FileStorage::new(self.active_config_dir())
    }

    pub fn active_set(&self) -> ExtensionSet {
        ExtensionSet::read_from(&self.live()).unwrap().unwrap()
    }

    pub fn registry(&self) -> SiteRegistry {
        SiteRegistry::with_cache(&self.root, self.root.join(".sitepack/cache"))
    }

    pub fn journal(&self) -> MigrationJournal {
        MigrationJournal::new(self.root.join(".sitepack/journal.jsonl"))
    }

    pub fn site_context(&self) -> SiteContext {
        SiteContext {
            root: self.root.clone(),
            profiles_dir: self.profiles_dir(),
            core_version: CORE_VERSION.to_string(),
            generator: GENERATOR.to_string(),
        }
    }

    /// Export that copies the live store, as used without an export command
    pub fn storage_export(&self) -> Box<dyn ConfigExport> {
        Box::new(StorageExport::new(Box::new(self.live())))
    }

    /// Orchestrator wired to this site's real adapters
    pub fn orchestrator(
        &self,
        export: Box<dyn ConfigExport>,
        confirmation: Box<dyn Confirmation>,
    ) -> MigrationOrchestrator {
        self.orchestrator_with_store(Box::new(self.live()), export, confirmation)
    }

    pub fn orchestrator_with_store(
        &self,
        live: Box<dyn ConfigStorage>,
        export: Box<dyn ConfigExport>,
        confirmation: Box<dyn Confirmation>,
    ) -> MigrationOrchestrator {
        MigrationOrchestrator::new(
            Box::new(self.registry()),
            live,
            SnapshotWriter::new(export),
            confirmation,
            SettingsFile::new(self.settings_path()),
            self.site_context(),
        )
        .with_journal(self.journal())
    }

    /// Every path under the root, relative, sorted
    pub fn tree(&self) -> Vec<String> {
        let mut paths: Vec<String> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .filter(|p| !p.is_empty())
            .collect();
        paths.sort();
        paths
    }
}
