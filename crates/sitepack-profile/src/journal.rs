//! Append-only migration journal (`.sitepack/journal.jsonl`)

use crate::events::{JournalEntry, MigrationEvent};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};

/// Default number of entries shown by `sitepack journal`
pub const DEFAULT_JOURNAL_LIMIT: usize = 20;

/// Journal of migration runs
#[derive(Debug, Clone)]
pub struct MigrationJournal {
    path: Utf8PathBuf,
}

impl MigrationJournal {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Append an entry (file-locked, synced)
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create journal directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open journal file")?;

        // Released on drop
        file.lock_exclusive()
            .context("Failed to acquire exclusive lock on journal")?;

        let line = serde_json::to_string(entry).context("Failed to serialize journal entry")?;
        writeln!(file, "{}", line).context("Failed to write journal entry")?;
        file.sync_all().context("Failed to sync journal file")?;
        Ok(())
    }

    /// Append, logging instead of failing
    pub fn record(&self, machine_name: &str, event: MigrationEvent) {
        let entry = JournalEntry::new(machine_name, event);
        if let Err(e) = self.append(&entry) {
            tracing::warn!("Could not write to journal {}: {:#}", self.path, e);
        }
    }

    /// All entries, oldest first
    ///
    /// Lines that don't parse are skipped with a warning so one torn write
    /// doesn't hide the rest of the history.
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path).context("Failed to open journal file")?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from journal")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping journal line {}: {}", number + 1, e),
            }
        }
        Ok(entries)
    }

    /// The most recent `limit` entries, oldest first
    pub fn tail(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}
