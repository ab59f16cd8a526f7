//! Profile types

use serde::{Deserialize, Serialize};

/// Naming of the profile being generated
///
/// Built once the names have passed validation and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    machine_name: String,
    display_name: String,
    description: String,
}

impl ProfileSpec {
    pub fn new(
        machine_name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            machine_name: machine_name.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }

    /// Identifier-safe unique key of the profile
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Human readable name written to the manifest
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
