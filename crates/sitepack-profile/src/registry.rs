//! Extension registry
//!
//! The registry answers "which installable units exist, and where do they
//! live". Which of them are *active* is recorded separately in the
//! `core.extension` document of the live configuration store.
//!
//! [`SiteRegistry`] discovers units by scanning the application root for
//! `<name>.info.yml` files. The on-disk index under the cache directory is
//! only written when caches are rebuilt after a profile switch; reads and
//! refreshes stay in memory, so validating a site never writes to it.

use camino::{Utf8Path, Utf8PathBuf};
use sitepack_core::types::{Extension, ExtensionKind, InfoFile, INFO_FILE_SUFFIX};
use sitepack_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories under the application root that may contain units
const SCAN_DIRS: &[&str] = &["core", "modules", "themes", "profiles", "sites"];

/// Directory names never descended into
const SKIP_DIRS: &[&str] = &["node_modules", "vendor", "files"];

/// Index file inside the cache directory
const INDEX_FILE: &str = "extensions.yml";

/// Phases of cache invalidation
///
/// Switching the active profile changes which units are loaded, and the
/// first pass over the caches runs while metadata still reflects the old
/// set. Invalidation is therefore a two-step contract: `Flush` drops
/// everything derived from the previous state, `Settle` rebuilds from the
/// new state. Callers must run both, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationPhase {
    Flush,
    Settle,
}

/// Read access to the installable units of a site
pub trait ExtensionRegistry {
    /// Discovered units of one kind, keyed by machine name
    ///
    /// May be served from a cache; call [`refresh`](Self::refresh) first
    /// when stale data would give a wrong answer.
    fn list(&mut self, kind: ExtensionKind) -> Result<BTreeMap<String, Extension>>;

    /// Rediscover units, bypassing any cache
    fn refresh(&mut self) -> Result<()>;

    /// Run one phase of cache invalidation
    fn invalidate(&mut self, phase: InvalidationPhase) -> Result<()>;

    /// Run the full two-phase invalidation
    fn invalidate_all(&mut self) -> Result<()> {
        self.invalidate(InvalidationPhase::Flush)?;
        self.invalidate(InvalidationPhase::Settle)
    }

    /// Look a unit up by machine name across all kinds
    fn find(&mut self, name: &str) -> Result<Option<Extension>> {
        for kind in [
            ExtensionKind::Module,
            ExtensionKind::Theme,
            ExtensionKind::Profile,
        ] {
            if let Some(extension) = self.list(kind)?.remove(name) {
                return Ok(Some(extension));
            }
        }
        Ok(None)
    }
}

/// Filesystem-backed registry for a site
pub struct SiteRegistry {
    /// Application root
    root: Utf8PathBuf,

    /// Directory holding the discovery index
    cache_dir: Option<Utf8PathBuf>,

    /// Discovered units, loaded lazily
    index: Option<Vec<Extension>>,
}

impl SiteRegistry {
    /// Create a registry without a persistent index
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache_dir: None,
            index: None,
        }
    }

    /// Create a registry that keeps its index in `cache_dir`
    pub fn with_cache(root: impl Into<Utf8PathBuf>, cache_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache_dir: Some(cache_dir.into()),
            index: None,
        }
    }

    /// Application root
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn index_path(&self) -> Option<Utf8PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(INDEX_FILE))
    }

    /// Load the index from memory, the cache file, or a fresh scan
    fn index(&mut self) -> Result<&[Extension]> {
        if self.index.is_none() {
            let index = match self.read_cached_index() {
                Some(index) => index,
                None => self.scan()?,
            };
            self.index = Some(index);
        }
        Ok(self.index.as_deref().unwrap_or_default())
    }

    fn read_cached_index(&self) -> Option<Vec<Extension>> {
        let path = self.index_path()?;
        let content = fs::read_to_string(&path).ok()?;
        match serde_yaml_ng::from_str(&content) {
            Ok(index) => {
                debug!("Using cached extension index {}", path);
                Some(index)
            }
            Err(e) => {
                warn!("Ignoring unreadable extension index {}: {}", path, e);
                None
            }
        }
    }

    fn write_cached_index(&self, index: &[Extension]) -> Result<()> {
        if let Some(path) = self.index_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, serde_yaml_ng::to_string(index)?)?;
            debug!("Wrote extension index with {} units to {}", index.len(), path);
        }
        Ok(())
    }

    fn is_skipped(entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        entry.depth() > 0
            && entry.file_type().is_dir()
            && (name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref()))
    }

    /// Walk the scan directories for info files
    fn scan(&self) -> Result<Vec<Extension>> {
        let mut found: BTreeMap<String, Extension> = BTreeMap::new();

        for dir in SCAN_DIRS {
            let base = self.root.join(dir);
            if !base.is_dir() {
                continue;
            }

            let walker = WalkDir::new(&base)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !Self::is_skipped(e));

            for entry in walker {
                let entry = entry.map_err(|e| Error::Io(e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(file_name) = entry.file_name().to_str() else {
                    continue;
                };
                let Some(name) = file_name.strip_suffix(INFO_FILE_SUFFIX) else {
                    continue;
                };

                let Ok(path) = Utf8PathBuf::try_from(entry.path().to_path_buf()) else {
                    warn!("Skipping non UTF-8 path {:?}", entry.path());
                    continue;
                };

                let info: InfoFile = match fs::read_to_string(&path)
                    .map_err(Error::from)
                    .and_then(|c| serde_yaml_ng::from_str(&c).map_err(Error::from))
                {
                    Ok(info) => info,
                    Err(e) => {
                        warn!("Skipping unreadable info file {}: {}", path, e);
                        continue;
                    }
                };

                let dir = path.parent().unwrap_or(path.as_path());
                let relative = dir.strip_prefix(&self.root).unwrap_or(dir).to_owned();

                if let Some(existing) = found.get(name) {
                    warn!(
                        "Duplicate unit '{}' at {} (keeping {})",
                        name, relative, existing.path
                    );
                    continue;
                }

                found.insert(
                    name.to_string(),
                    Extension {
                        name: name.to_string(),
                        kind: info.kind,
                        path: relative,
                        info,
                    },
                );
            }
        }

        info!("Discovered {} installable units", found.len());
        Ok(found.into_values().collect())
    }
}

impl ExtensionRegistry for SiteRegistry {
    fn list(&mut self, kind: ExtensionKind) -> Result<BTreeMap<String, Extension>> {
        Ok(self
            .index()?
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.name.clone(), e.clone()))
            .collect())
    }

    fn refresh(&mut self) -> Result<()> {
        self.index = Some(self.scan()?);
        Ok(())
    }

    fn invalidate(&mut self, phase: InvalidationPhase) -> Result<()> {
        match phase {
            InvalidationPhase::Flush => {
                self.index = None;
                if let Some(cache_dir) = &self.cache_dir {
                    if cache_dir.exists() {
                        fs::remove_dir_all(cache_dir)?;
                    }
                }
                debug!("Flushed extension caches");
            }
            InvalidationPhase::Settle => {
                let index = self.scan()?;
                self.write_cached_index(&index)?;
                self.index = Some(index);
                debug!("Rebuilt extension caches");
            }
        }
        Ok(())
    }
}
