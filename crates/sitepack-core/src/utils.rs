//! Shared utility functions for sitepack crates

use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// Major version of a core release string
///
/// Accepts full semantic versions ("10.3.1") as well as the shorter
/// forms core releases use ("11.0", "11.1-dev", "10").
pub fn core_major_version(version: &str) -> Result<u64> {
    let version = version.trim();
    if let Ok(parsed) = semver::Version::parse(version) {
        return Ok(parsed.major);
    }

    version
        .split('.')
        .next()
        .and_then(|major| major.split('-').next())
        .and_then(|major| major.parse::<u64>().ok())
        .ok_or_else(|| Error::invalid_version(version))
}

/// Whether a new file can be created in `dir`
///
/// Probes with a temporary file that is removed again on drop, so the
/// answer reflects the effective permissions of this process.
pub fn dir_accepts_writes(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    tempfile::Builder::new()
        .prefix(".sitepack-probe-")
        .tempfile_in(dir)
        .is_ok()
}

/// Whether an existing file can be opened for writing
pub fn file_is_writable(path: &Path) -> bool {
    path.is_file() && OpenOptions::new().append(true).open(path).is_ok()
}
