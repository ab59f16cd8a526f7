//! Error types for sitepack-core

use thiserror::Error;

/// Result type alias using sitepack-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for sitepack
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration document could not be read or written
    #[error("Configuration document '{name}' in {location}: {message}")]
    Document {
        name: String,
        location: String,
        message: String,
    },

    /// Invalid configuration document name
    #[error("Invalid configuration document name: '{name}'")]
    InvalidDocumentName { name: String },

    /// Invalid core version
    #[error("Invalid core version: {version}")]
    InvalidVersion { version: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a document error
    pub fn document(
        name: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Document {
            name: name.into(),
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an invalid document name error
    pub fn invalid_document_name(name: impl Into<String>) -> Self {
        Self::InvalidDocumentName { name: name.into() }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }
}
