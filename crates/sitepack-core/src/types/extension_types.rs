//! Installable unit types: info files, discovered extensions and the
//! active extension set (`core.extension`).

use crate::error::{Error, Result};
use crate::storage::ConfigStorage;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the configuration document holding the active extension set
pub const EXTENSION_SET_DOCUMENT: &str = "core.extension";

/// Suffix of an installable unit's info file
pub const INFO_FILE_SUFFIX: &str = ".info.yml";

/// Kind of installable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    Module,
    Theme,
    Profile,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionKind::Module => write!(f, "module"),
            ExtensionKind::Theme => write!(f, "theme"),
            ExtensionKind::Profile => write!(f, "profile"),
        }
    }
}

/// Contents of a `<machine_name>.info.yml` file
///
/// Field order matters: it is the order written into generated profile
/// manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoFile {
    /// Human readable name
    pub name: String,

    /// Unit kind
    #[serde(rename = "type")]
    pub kind: ExtensionKind,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Core version constraint (e.g. ">=10")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_version_requirement: Option<String>,
}

impl InfoFile {
    /// Build the manifest for a generated profile
    pub fn profile(
        name: impl Into<String>,
        description: impl Into<String>,
        core_major_version: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ExtensionKind::Profile,
            description: description.into(),
            core_version_requirement: Some(format!(">={}", core_major_version)),
        }
    }
}

/// A discovered installable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Machine name (the info file's stem)
    pub name: String,

    /// Unit kind
    pub kind: ExtensionKind,

    /// Directory containing the info file, relative to the application root
    pub path: Utf8PathBuf,

    /// Parsed info file
    pub info: InfoFile,
}

/// The active extension set stored in `core.extension`
///
/// ```yaml
/// module:
///   node: 0
///   standard: 1000
/// theme:
///   olivero: 0
/// profile: standard
/// ```
///
/// Keys other than `module`, `theme` and `profile` are carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSet {
    /// Active modules (profiles included) with their weights
    #[serde(default)]
    pub module: BTreeMap<String, i64>,

    /// Active themes with their weights
    #[serde(default)]
    pub theme: BTreeMap<String, i64>,

    /// Active profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Any other keys in the document
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExtensionSet {
    /// Parse from a configuration document
    pub fn from_value(value: Value) -> Result<Self> {
        serde_yaml_ng::from_value(value).map_err(|e| {
            Error::document(EXTENSION_SET_DOCUMENT, "active extension set", e.to_string())
        })
    }

    /// Convert into a configuration document
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_yaml_ng::to_value(self)?)
    }

    /// Read the set from a configuration store, `None` if the document is absent
    pub fn read_from(store: &dyn ConfigStorage) -> Result<Option<Self>> {
        store.read(EXTENSION_SET_DOCUMENT)?.map(Self::from_value).transpose()
    }

    /// Highest weight among active modules and themes (0 when empty)
    pub fn highest_weight(&self) -> i64 {
        self.module
            .values()
            .chain(self.theme.values())
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Names of active units of one kind
    ///
    /// Profiles are recorded in the module map; `Module` excludes the
    /// active profile.
    pub fn active_names(&self, kind: ExtensionKind) -> Vec<&str> {
        match kind {
            ExtensionKind::Module => self
                .module
                .keys()
                .filter(|name| Some(name.as_str()) != self.profile.as_deref())
                .map(String::as_str)
                .collect(),
            ExtensionKind::Theme => self.theme.keys().map(String::as_str).collect(),
            ExtensionKind::Profile => self.profile.as_deref().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE_EXTENSION: &str = r#"
_core:
  default_config_hash: R4IF-ClDHXxblLcG0L7MgsLvfBIMAvi_skumNFQwkDc
module:
  block: 0
  node: 0
  views: 10
  standard: 1000
theme:
  olivero: 0
  claro: 0
profile: standard
"#;

    fn parse(yaml: &str) -> ExtensionSet {
        let value: Value = serde_yaml_ng::from_str(yaml).unwrap();
        ExtensionSet::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_extension_set() {
        let set = parse(CORE_EXTENSION);
        assert_eq!(set.profile.as_deref(), Some("standard"));
        assert_eq!(set.module.get("views"), Some(&10));
        assert_eq!(set.theme.len(), 2);
        assert!(set.extra.contains_key("_core"));
    }

    #[test]
    fn test_read_from_store() {
        use crate::storage::MemoryStorage;

        let mut store = MemoryStorage::new();
        assert!(ExtensionSet::read_from(&store).unwrap().is_none());

        let value: Value = serde_yaml_ng::from_str(CORE_EXTENSION).unwrap();
        store.write(EXTENSION_SET_DOCUMENT, &value).unwrap();
        let set = ExtensionSet::read_from(&store).unwrap().unwrap();
        assert_eq!(set.profile.as_deref(), Some("standard"));
    }

    #[test]
    fn test_highest_weight() {
        assert_eq!(parse(CORE_EXTENSION).highest_weight(), 1000);
        assert_eq!(ExtensionSet::default().highest_weight(), 0);

        let mut negative = ExtensionSet::default();
        negative.module.insert("early".to_string(), -5);
        assert_eq!(negative.highest_weight(), -5);
    }

    #[test]
    fn test_active_modules_exclude_profile() {
        let set = parse(CORE_EXTENSION);
        let modules = set.active_names(ExtensionKind::Module);
        assert!(modules.contains(&"node"));
        assert!(!modules.contains(&"standard"));
        assert_eq!(set.active_names(ExtensionKind::Profile), vec!["standard"]);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let set = parse(CORE_EXTENSION);
        let reparsed = ExtensionSet::from_value(set.to_value().unwrap()).unwrap();
        assert_eq!(set, reparsed);
    }

    #[test]
    fn test_profile_manifest_field_order() {
        let info = InfoFile::profile("My Site", "", 10);
        let yaml = serde_yaml_ng::to_string(&info).unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec!["name", "type", "description", "core_version_requirement"]
        );
        assert!(yaml.contains("type: profile"));
        assert!(yaml.contains(">=10"));
    }
}
