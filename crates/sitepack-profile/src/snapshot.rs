//! Configuration snapshot export
//!
//! Exporting the full active configuration is the one genuinely external
//! step of a migration. It is modelled as a synchronous [`ConfigExport`]
//! capability returning a typed [`ExportOutcome`]; [`SnapshotWriter`]
//! turns that outcome into an all-or-nothing result.

use crate::error::ExportError;
use camino::{Utf8Path, Utf8PathBuf};
use sitepack_core::{ConfigStorage, FileStorage};
use tracing::{debug, info, warn};

/// Placeholder replaced with the snapshot directory in export commands
pub const DESTINATION_PLACEHOLDER: &str = "{destination}";

/// Result of one export attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub success: bool,
    /// Output of the export, kept for error reporting
    pub diagnostics: String,
}

impl ExportOutcome {
    pub fn succeeded(diagnostics: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Capability that writes the full active configuration to a directory
#[cfg_attr(test, mockall::automock)]
pub trait ConfigExport {
    /// Export every active configuration document into `destination`
    fn export_to(&self, destination: &Utf8Path) -> ExportOutcome;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Export by running an external command
#[derive(Debug, Clone)]
pub struct CommandExport {
    program: String,
    args: Vec<String>,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandExport {
    /// Build from a command line such as
    /// `["drush", "config-export", "--destination={destination}", "-y"]`
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    /// Run the command from `dir`
    pub fn with_working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn render_args(&self, destination: &Utf8Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(DESTINATION_PLACEHOLDER, destination.as_str()))
            .collect()
    }
}

impl ConfigExport for CommandExport {
    fn export_to(&self, destination: &Utf8Path) -> ExportOutcome {
        let args = self.render_args(destination);
        debug!("Running export: {} {}", self.program, args.join(" "));

        let mut expression = duct::cmd(self.program.as_str(), &args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked();
        if let Some(dir) = &self.working_dir {
            expression = expression.dir(dir.as_std_path());
        }

        match expression.run() {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if output.status.success() {
                    ExportOutcome::succeeded(text)
                } else {
                    let code = output
                        .status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    ExportOutcome::failed(format!(
                        "{} exited with {}{}{}",
                        self.program,
                        code,
                        if text.is_empty() { "" } else { ": " },
                        text
                    ))
                }
            }
            Err(e) => ExportOutcome::failed(format!("could not run {}: {}", self.program, e)),
        }
    }

    fn describe(&self) -> String {
        format!("command `{} {}`", self.program, self.args.join(" "))
    }
}

/// Export by copying every document of a configuration store
pub struct StorageExport {
    source: Box<dyn ConfigStorage>,
}

impl StorageExport {
    pub fn new(source: Box<dyn ConfigStorage>) -> Self {
        Self { source }
    }

    fn copy_all(&self, destination: &Utf8Path) -> sitepack_core::Result<usize> {
        let mut target = FileStorage::new(destination);
        let names = self.source.list_all("")?;
        for name in &names {
            match self.source.read(name)? {
                Some(data) => target.write(name, &data)?,
                None => warn!("Configuration document {} disappeared during export", name),
            }
        }
        Ok(names.len())
    }
}

impl ConfigExport for StorageExport {
    fn export_to(&self, destination: &Utf8Path) -> ExportOutcome {
        match self.copy_all(destination) {
            Ok(count) => ExportOutcome::succeeded(format!(
                "Exported {} configuration documents from {}",
                count,
                self.source.location()
            )),
            Err(e) => ExportOutcome::failed(e.to_string()),
        }
    }

    fn describe(&self) -> String {
        format!("copy of {}", self.source.location())
    }
}

/// All-or-nothing wrapper around a [`ConfigExport`]
pub struct SnapshotWriter {
    export: Box<dyn ConfigExport>,
}

impl SnapshotWriter {
    pub fn new(export: Box<dyn ConfigExport>) -> Self {
        Self { export }
    }

    /// Export the full active configuration into `destination`
    ///
    /// A failed outcome is surfaced as [`ExportError`]; nothing is retried
    /// or cleaned up.
    pub fn export_all(&self, destination: &Utf8Path) -> Result<(), ExportError> {
        if !destination.is_dir() {
            return Err(ExportError {
                destination: destination.to_owned(),
                diagnostics: "destination directory does not exist".to_string(),
            });
        }

        info!(
            "Exporting active configuration to {} via {}",
            destination,
            self.export.describe()
        );
        let outcome = self.export.export_to(destination);
        if !outcome.success {
            return Err(ExportError {
                destination: destination.to_owned(),
                diagnostics: outcome.diagnostics,
            });
        }

        if !outcome.diagnostics.is_empty() {
            debug!("Export output: {}", outcome.diagnostics);
        }
        Ok(())
    }
}
