//! `sitepack generate`: convert the running site into a profile

use anyhow::Result;
use camino::Utf8Path;
use dialoguer::Confirm;
use sitepack_profile::{
    ActivationError, AssumeYes, ConfigExport, Confirmation, ExportOutcome, MigrationError,
    MigrationOutcome, MigrationReport, MigrationRequest, SettingsOutcome,
};
use std::process::ExitCode;

use super::{configured_export, load_config, open_site, EXIT_CANCELLED, EXIT_SNAPSHOT_STALE};
use crate::cli::GenerateArgs;
use crate::output;

/// Interactive confirmation on the terminal
///
/// Without a terminal to ask on, the answer is no.
struct PromptConfirmation;

impl Confirmation for PromptConfirmation {
    fn confirm(&self, prompt: &str) -> Result<bool, String> {
        if !console::user_attended_stderr() {
            output::warning("No terminal to confirm on; pass --yes to run non-interactively");
            return Ok(false);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| e.to_string())
    }
}

/// Shows a spinner while the wrapped export runs
struct SpinnerExport {
    inner: Box<dyn ConfigExport>,
}

impl ConfigExport for SpinnerExport {
    fn export_to(&self, destination: &Utf8Path) -> ExportOutcome {
        let spinner = output::spinner("Exporting active configuration...");
        let outcome = self.inner.export_to(destination);
        spinner.finish_and_clear();
        outcome
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

pub fn run(args: GenerateArgs, config_path: Option<&Utf8Path>) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let confirmation: Box<dyn Confirmation> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirmation)
    };
    let export = Box::new(SpinnerExport {
        inner: configured_export(&config)?,
    });
    let mut orchestrator = open_site(&config, export, confirmation)?;

    let request = MigrationRequest {
        name: args.name,
        machine_name: args.machine_name,
        description: args.description,
    };

    let result = orchestrator.run(&request);
    match &result {
        Ok(MigrationOutcome::Completed(report)) => print_report(report),
        Ok(MigrationOutcome::Cancelled) => output::warning("Profile generation cancelled"),
        Err(e) => report_failure(e),
    }
    Ok(ExitCode::from(exit_status(&result)))
}

/// Process exit status for a migration result
fn exit_status(result: &Result<MigrationOutcome, MigrationError>) -> u8 {
    match result {
        Ok(MigrationOutcome::Completed(_)) => 0,
        Ok(MigrationOutcome::Cancelled) => EXIT_CANCELLED,
        Err(e) if e.live_state_changed() => EXIT_SNAPSHOT_STALE,
        Err(_) => 1,
    }
}

fn print_report(report: &MigrationReport) {
    output::success(&format!(
        "Profile '{}' generated and activated",
        report.display_name
    ));
    output::kv("Machine name", &report.machine_name);
    output::kv("Package", report.package_root.as_str());
    output::kv("Snapshot", report.sync_dir.as_str());
    output::kv(
        "Previous profile",
        report.previous_profile.as_deref().unwrap_or("(none)"),
    );
    output::kv("Weight", &report.weight.to_string());

    if let SettingsOutcome::Updated { path } = &report.settings {
        output::info(&format!("Updated config_sync_directory in {}", path));
    }

    for warning in &report.warnings {
        output::warning(warning);
    }
}

fn report_failure(err: &MigrationError) {
    match err {
        MigrationError::Validation(e) => super::report_validation_error(e),
        MigrationError::Activation(ActivationError::SnapshotReconcile {
            profile,
            document,
            sync_dir,
            message,
        }) => {
            output::error(&format!(
                "The running site has switched to profile '{}'",
                profile
            ));
            output::error(&format!(
                "The package does not reflect that switch: writing {} to {} failed: {}",
                document, sync_dir, message
            ));
            output::info(&format!(
                "Copy the live {} into {}/{}.yml by hand; do not run generate again",
                document, sync_dir, document
            ));
        }
        other => {
            output::error(&other.to_string());
            if let MigrationError::Scaffold(_) | MigrationError::Export(_) = other {
                output::info(
                    "The live site is unchanged; remove the package directory before retrying",
                );
            }
        }
    }
}
