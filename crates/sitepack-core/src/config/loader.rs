//! Configuration file loading and path resolution

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["sitepack.yaml", "sitepack.yml"];

/// Default site directory, relative to the application root
const DEFAULT_SITE_DIR: &str = "sites/default";

/// Default machine name of the generator's own unit
pub const DEFAULT_GENERATOR: &str = "profile_generator";

/// Directory (under the application root) for sitepack's own state
pub const STATE_DIR: &str = ".sitepack";

/// Contents of `sitepack.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitepackConfigFile {
    /// Application root (contains `profiles/`)
    #[serde(default = "default_root")]
    pub root: Utf8PathBuf,

    /// Site directory, relative to the root
    #[serde(default = "default_site")]
    pub site: Utf8PathBuf,

    /// Settings file, relative to the root (default `<site>/settings.yml`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<Utf8PathBuf>,

    /// Live configuration directory, relative to the root
    /// (default `<site>/config/active`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_config: Option<Utf8PathBuf>,

    /// Version of the running core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_version: Option<String>,

    /// Machine name of the generator's own unit
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Configuration export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// How the configuration snapshot is produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// External export command; `{destination}` is replaced with the
    /// snapshot directory. Without a command the live configuration
    /// directory is copied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

fn default_site() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SITE_DIR)
}

fn default_generator() -> String {
    DEFAULT_GENERATOR.to_string()
}

impl Default for SitepackConfigFile {
    fn default() -> Self {
        Self {
            root: default_root(),
            site: default_site(),
            settings_file: None,
            active_config: None,
            core_version: None,
            generator: default_generator(),
            export: ExportConfig::default(),
        }
    }
}

/// Loaded sitepack configuration with paths resolved
#[derive(Debug, Clone)]
pub struct SitepackConfig {
    /// The parsed configuration
    pub config: SitepackConfigFile,

    /// Path to the configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,

    /// Directory relative paths are resolved against
    pub working_dir: Utf8PathBuf,
}

impl SitepackConfig {
    /// Load configuration from the specified path or search for it
    ///
    /// An explicit path must exist. Without one, the current directory and
    /// its parents are searched; if nothing is found the defaults apply
    /// relative to the current directory.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let found = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                Some((p.to_owned(), content))
            }
            None => Self::find_config(&Self::current_dir()?)?,
        };

        match found {
            Some((config_path, content)) => {
                let working_dir = config_path
                    .parent()
                    .map(|p| p.to_owned())
                    .unwrap_or_else(|| Utf8PathBuf::from("."));
                let config = Self::parse(&content)?;
                debug!("Loaded configuration from {}", config_path);
                Ok(Self {
                    config,
                    config_path: Some(config_path),
                    working_dir,
                })
            }
            None => {
                debug!("No sitepack.yaml found, using defaults");
                Ok(Self::with_defaults(Self::current_dir()?))
            }
        }
    }

    /// Default configuration rooted at `working_dir`
    pub fn with_defaults(working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config: SitepackConfigFile::default(),
            config_path: None,
            working_dir: working_dir.into(),
        }
    }

    /// Parse configuration YAML; an empty file yields the defaults
    pub fn parse(content: &str) -> Result<SitepackConfigFile> {
        if content.trim().is_empty() {
            return Ok(SitepackConfigFile::default());
        }
        let config: SitepackConfigFile = serde_yaml_ng::from_str(content)?;
        if config.generator.trim().is_empty() {
            return Err(Error::invalid_config("generator must not be empty"));
        }
        if let Some(command) = &config.export.command {
            if command.is_empty() {
                return Err(Error::invalid_config("export.command must not be empty"));
            }
        }
        Ok(config)
    }

    fn current_dir() -> Result<Utf8PathBuf> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))
    }

    /// Find a configuration file in `start` or its parent directories
    fn find_config(start: &Utf8Path) -> Result<Option<(Utf8PathBuf, String)>> {
        let mut current = start;

        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let content = fs::read_to_string(&path)?;
                    return Ok(Some((path, content)));
                }
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Application root
    pub fn root(&self) -> Utf8PathBuf {
        self.working_dir.join(&self.config.root)
    }

    /// Directory new profiles are created in
    pub fn profiles_dir(&self) -> Utf8PathBuf {
        self.root().join("profiles")
    }

    /// Site directory
    pub fn site_dir(&self) -> Utf8PathBuf {
        self.root().join(&self.config.site)
    }

    /// Settings file receiving the `config_sync_directory` pointer
    pub fn settings_file(&self) -> Utf8PathBuf {
        match &self.config.settings_file {
            Some(path) => self.root().join(path),
            None => self.site_dir().join("settings.yml"),
        }
    }

    /// Live configuration directory
    pub fn active_config_dir(&self) -> Utf8PathBuf {
        match &self.config.active_config {
            Some(path) => self.root().join(path),
            None => self.site_dir().join("config").join("active"),
        }
    }

    /// sitepack's own state directory
    pub fn state_dir(&self) -> Utf8PathBuf {
        self.root().join(STATE_DIR)
    }

    /// Migration journal
    pub fn journal_path(&self) -> Utf8PathBuf {
        self.state_dir().join("journal.jsonl")
    }

    /// Extension discovery cache
    pub fn cache_dir(&self) -> Utf8PathBuf {
        self.state_dir().join("cache")
    }

    /// Running core version, required for profile manifests
    pub fn core_version(&self) -> Result<&str> {
        self.config.core_version.as_deref().ok_or_else(|| {
            Error::invalid_config(
                "core_version is not set (add `core_version: \"<x.y.z>\"` to sitepack.yaml)",
            )
        })
    }

    /// Machine name of the generator's own unit
    pub fn generator(&self) -> &str {
        &self.config.generator
    }

    /// External export command, if configured
    pub fn export_command(&self) -> Option<&[String]> {
        self.config.export.command.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = SitepackConfig::parse("").unwrap();
        assert_eq!(config, SitepackConfigFile::default());
        assert_eq!(config.generator, DEFAULT_GENERATOR);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
root: web
site: sites/example
settings_file: sites/example/settings.yml
active_config: ../config/active
core_version: "10.3.1"
generator: my_generator
export:
  command: ["drush", "config-export", "--destination={destination}", "-y"]
"#;
        let config = SitepackConfig::parse(yaml).unwrap();
        assert_eq!(config.root, Utf8PathBuf::from("web"));
        assert_eq!(config.core_version.as_deref(), Some("10.3.1"));
        assert_eq!(config.generator, "my_generator");
        assert_eq!(config.export.command.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(SitepackConfig::parse("rooot: web\n").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_command() {
        assert!(SitepackConfig::parse("export:\n  command: []\n").is_err());
    }

    #[test]
    fn test_default_paths() {
        let config = SitepackConfig::with_defaults("/srv/app");
        assert_eq!(config.profiles_dir(), Utf8PathBuf::from("/srv/app/./profiles"));
        assert_eq!(
            config.settings_file(),
            Utf8PathBuf::from("/srv/app/./sites/default/settings.yml")
        );
        assert_eq!(
            config.active_config_dir(),
            Utf8PathBuf::from("/srv/app/./sites/default/config/active")
        );
        assert!(config.core_version().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = dir.join("sitepack.yaml");
        fs::write(&path, "root: web\ncore_version: \"11.0\"\n").unwrap();

        let config = SitepackConfig::load(Some(&path)).unwrap();
        assert_eq!(config.working_dir, dir);
        assert_eq!(config.root(), dir.join("web"));
        assert_eq!(config.core_version().unwrap(), "11.0");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = SitepackConfig::load(Some(Utf8Path::new("/nonexistent/sitepack.yaml")));
        assert!(matches!(err, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("sitepack.yml"), "generator: gen\n").unwrap();
        let nested = dir.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let (path, content) = SitepackConfig::find_config(&nested).unwrap().unwrap();
        assert_eq!(path, dir.join("sitepack.yml"));
        assert!(content.contains("gen"));
    }

    #[test]
    #[serial]
    fn test_load_without_config_uses_current_dir() {
        let temp = TempDir::new().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();

        let result = SitepackConfig::load(None);
        let cwd = Utf8PathBuf::try_from(std::env::current_dir().unwrap()).unwrap();
        std::env::set_current_dir(previous).unwrap();

        let config = result.unwrap();
        assert!(config.config_path.is_none());
        assert_eq!(config.working_dir, cwd);
        assert_eq!(config.generator(), DEFAULT_GENERATOR);
    }
}
