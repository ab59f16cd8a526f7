//! Site settings file update
//!
//! After activation the site's settings must point `config_sync_directory`
//! at the new package's snapshot. The settings file is often read-only on
//! purpose, so the update relaxes permissions for the write and puts them
//! back afterwards. When the file still cannot be written the operator
//! gets the exact line to add by hand.

use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::{Mapping, Value};
use sitepack_core::utils::file_is_writable;
use sitepack_core::{Error, Result};
use std::fs;
use tracing::{debug, info, warn};

/// Settings key holding the configuration snapshot directory
pub const SYNC_DIRECTORY_KEY: &str = "config_sync_directory";

/// Mode applied while writing a read-only settings file
#[cfg(unix)]
const RELAXED_MODE: u32 = 0o644;

/// Result of a settings update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOutcome {
    /// The file now points at the new directory
    Updated { path: Utf8PathBuf },

    /// The file was left alone; `line` must be added by hand
    Manual {
        path: Utf8PathBuf,
        line: String,
        reason: String,
    },
}

/// A YAML site settings file
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: Utf8PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Line to add by hand when the file cannot be updated
    pub fn manual_line(sync_directory: &str) -> String {
        format!("{}: {}", SYNC_DIRECTORY_KEY, sync_directory)
    }

    /// Current value of `config_sync_directory`, if any
    pub fn sync_directory(&self) -> Result<Option<String>> {
        let mapping = self.read_mapping()?;
        Ok(mapping
            .get(SYNC_DIRECTORY_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Point `config_sync_directory` at `sync_directory`
    ///
    /// Never fails: problems are reported as [`SettingsOutcome::Manual`].
    pub fn point_sync_directory(&self, sync_directory: &str) -> SettingsOutcome {
        match self.try_update(sync_directory) {
            Ok(()) => {
                info!("Set {} to {} in {}", SYNC_DIRECTORY_KEY, sync_directory, self.path);
                SettingsOutcome::Updated {
                    path: self.path.clone(),
                }
            }
            Err(e) => {
                warn!("Could not update {}: {}", self.path, e);
                SettingsOutcome::Manual {
                    path: self.path.clone(),
                    line: Self::manual_line(sync_directory),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn read_mapping(&self) -> Result<Mapping> {
        if !self.path.is_file() {
            return Err(Error::config_not_found(self.path.as_str()));
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Mapping::new());
        }
        match serde_yaml_ng::from_str(&content)? {
            Value::Mapping(mapping) => Ok(mapping),
            Value::Null => Ok(Mapping::new()),
            _ => Err(Error::invalid_config(format!(
                "{} is not a mapping of settings",
                self.path
            ))),
        }
    }

    fn try_update(&self, sync_directory: &str) -> Result<()> {
        let mut mapping = self.read_mapping()?;
        mapping.insert(
            Value::String(SYNC_DIRECTORY_KEY.to_string()),
            Value::String(sync_directory.to_string()),
        );
        let content = serde_yaml_ng::to_string(&Value::Mapping(mapping))?;

        if file_is_writable(self.path.as_std_path()) {
            fs::write(&self.path, content)?;
            return Ok(());
        }
        self.write_relaxed(&content)
    }

    #[cfg(unix)]
    fn write_relaxed(&self, content: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let original = fs::metadata(&self.path)?.permissions();
        debug!(
            "Relaxing {} from {:o} to {:o}",
            self.path,
            original.mode() & 0o777,
            RELAXED_MODE
        );
        fs::set_permissions(&self.path, fs::Permissions::from_mode(RELAXED_MODE))?;

        let written = fs::write(&self.path, content);
        let restored = fs::set_permissions(&self.path, original);
        written?;
        restored?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn write_relaxed(&self, _content: &str) -> Result<()> {
        Err(Error::invalid_config(format!("{} is not writable", self.path)))
    }
}
