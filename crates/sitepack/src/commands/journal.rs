//! `sitepack journal`: show recorded migration runs

use anyhow::{Context, Result};
use camino::Utf8Path;
use sitepack_profile::{JournalEntry, MigrationJournal};
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};

use super::load_config;
use crate::cli::JournalArgs;
use crate::output;

#[derive(Tabled)]
struct JournalRow {
    time: String,
    profile: String,
    event: String,
    details: String,
}

impl From<&JournalEntry> for JournalRow {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            time: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            profile: entry.machine_name.clone(),
            event: entry.event.name().to_string(),
            details: entry.event.to_string(),
        }
    }
}

pub fn run(args: JournalArgs, config_path: Option<&Utf8Path>) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let journal = MigrationJournal::new(config.journal_path());
    let entries = journal
        .tail(args.limit)
        .context("Failed to read migration journal")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize journal")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    if entries.is_empty() {
        output::info(&format!("No migrations recorded in {}", journal.path()));
        return Ok(ExitCode::SUCCESS);
    }

    output::header("Migration journal");
    let rows: Vec<JournalRow> = entries.iter().map(JournalRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(ExitCode::SUCCESS)
}
