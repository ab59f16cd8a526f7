//! CLI command implementations

pub mod check;
pub mod generate;
pub mod journal;

use anyhow::{Context, Result};
use camino::Utf8Path;
use sitepack_core::{FileStorage, SitepackConfig};
use sitepack_profile::{
    CommandExport, ConfigExport, Confirmation, MigrationJournal, MigrationOrchestrator,
    SettingsFile, SiteContext, SiteRegistry, SnapshotWriter, StorageExport, ValidationError,
};
use tabled::{settings::Style, Table, Tabled};

use crate::output;

/// Exit status when the operator declined
pub const EXIT_CANCELLED: u8 = 2;

/// Exit status when the live site switched but the package is stale
pub const EXIT_SNAPSHOT_STALE: u8 = 3;

/// Load `sitepack.yaml`
pub fn load_config(config_path: Option<&Utf8Path>) -> Result<SitepackConfig> {
    let config =
        SitepackConfig::load(config_path).context("Failed to load sitepack configuration")?;
    tracing::debug!("Application root: {}", config.root());
    Ok(config)
}

/// Export capability selected by the configuration
pub fn configured_export(config: &SitepackConfig) -> Result<Box<dyn ConfigExport>> {
    match config.export_command() {
        Some(command) => {
            let export = CommandExport::from_command_line(command)
                .context("export.command must name a program")?
                .with_working_dir(config.root());
            Ok(Box::new(export))
        }
        None => Ok(Box::new(StorageExport::new(Box::new(FileStorage::new(
            config.active_config_dir(),
        ))))),
    }
}

/// Wire the orchestrator to the site described by `config`
pub fn open_site(
    config: &SitepackConfig,
    export: Box<dyn ConfigExport>,
    confirmation: Box<dyn Confirmation>,
) -> Result<MigrationOrchestrator> {
    let site = SiteContext::from_config(config)
        .context("core_version must be set in sitepack.yaml")?;

    Ok(MigrationOrchestrator::new(
        Box::new(SiteRegistry::with_cache(config.root(), config.cache_dir())),
        Box::new(FileStorage::new(config.active_config_dir())),
        SnapshotWriter::new(export),
        confirmation,
        SettingsFile::new(config.settings_file()),
        site,
    )
    .with_journal(MigrationJournal::new(config.journal_path())))
}

#[derive(Tabled)]
struct UnitRow {
    name: String,
    kind: String,
    path: String,
}

/// Print a validation failure, listing offending units as a table
pub fn report_validation_error(err: &ValidationError) {
    output::error(&err.to_string());

    if let ValidationError::ForeignExtensions { extensions, .. } = err {
        let rows: Vec<UnitRow> = extensions
            .iter()
            .map(|e| UnitRow {
                name: e.name.clone(),
                kind: e.kind.to_string(),
                path: e.path.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
}
