//! `sitepack check`: validate without changing anything

use anyhow::Result;
use camino::Utf8Path;
use sitepack_core::{FileStorage, SitepackConfig};
use sitepack_profile::{
    MigrationRequest, NameValidator, ResolvedNames, SiteRegistry, ValidationError,
};
use std::process::ExitCode;

use super::{load_config, report_validation_error};
use crate::cli::CheckArgs;
use crate::output;

pub fn run(args: CheckArgs, config_path: Option<&Utf8Path>) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let request = MigrationRequest {
        name: args.name,
        machine_name: args.machine_name,
        description: None,
    };

    match validate_site(&config, &request) {
        Ok(names) => {
            output::success(&format!(
                "A profile '{}' can be generated from this site",
                names.display_name
            ));
            output::kv("Machine name", &names.machine_name);
            output::kv(
                "Package",
                config.profiles_dir().join(&names.machine_name).as_str(),
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_validation_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run the name validator against the configured site
///
/// Only the paths are needed; the core version and export settings are
/// left alone.
fn validate_site(
    config: &SitepackConfig,
    request: &MigrationRequest,
) -> Result<ResolvedNames, ValidationError> {
    let names = request.resolve();
    let mut registry = SiteRegistry::with_cache(config.root(), config.cache_dir());
    let live = FileStorage::new(config.active_config_dir());
    let profiles_dir = config.profiles_dir();

    NameValidator::new(&mut registry, &live, &profiles_dir)
        .validate(&names.display_name, &names.machine_name)?;
    Ok(names)
}
