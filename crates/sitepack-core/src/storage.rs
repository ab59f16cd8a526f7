//! Configuration document storage
//!
//! A configuration store maps document names (e.g. `system.site`,
//! `core.extension`) to structured YAML values. The live store and the
//! snapshot inside a profile package share this interface; the snapshot
//! is always a [`FileStorage`], one `<name>.yml` file per document.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use tracing::debug;

/// File extension of configuration documents
pub const DOCUMENT_EXTENSION: &str = "yml";

/// Key-value store of configuration documents
pub trait ConfigStorage {
    /// Whether a document exists
    fn exists(&self, name: &str) -> bool;

    /// Read a document, `None` if it does not exist
    fn read(&self, name: &str) -> Result<Option<Value>>;

    /// Write (create or replace) a document
    fn write(&mut self, name: &str, data: &Value) -> Result<()>;

    /// Delete a document; returns whether it existed
    fn delete(&mut self, name: &str) -> Result<bool>;

    /// Names of all documents starting with `prefix`, sorted
    fn list_all(&self, prefix: &str) -> Result<Vec<String>>;

    /// Human readable location for messages
    fn location(&self) -> String;
}

/// Reject names that would escape the storage directory
fn check_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(Error::invalid_document_name(name));
    }
    Ok(())
}

/// Directory-backed configuration storage
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: Utf8PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `directory` (created lazily on first write)
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Storage directory
    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Path of the file backing a document
    pub fn file_path(&self, name: &str) -> Result<Utf8PathBuf> {
        check_name(name)?;
        Ok(self
            .directory
            .join(format!("{}.{}", name, DOCUMENT_EXTENSION)))
    }
}

impl ConfigStorage for FileStorage {
    fn exists(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, name: &str) -> Result<Option<Value>> {
        let path = self.file_path(name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::document(name, self.location(), e.to_string())),
        };

        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::document(name, self.location(), e.to_string()))?;
        Ok(Some(value))
    }

    fn write(&mut self, name: &str, data: &Value) -> Result<()> {
        let path = self.file_path(name)?;
        fs::create_dir_all(&self.directory)?;

        let content = serde_yaml_ng::to_string(data)?;

        // Write next to the target and rename so readers never see half a document
        let mut tmp = tempfile::Builder::new()
            .prefix(".sitepack-")
            .tempfile_in(&self.directory)
            .map_err(|e| Error::document(name, self.location(), e.to_string()))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| Error::document(name, self.location(), e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| Error::document(name, self.location(), e.error.to_string()))?;

        debug!("Wrote configuration document {} to {}", name, path);
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        let path = self.file_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::document(name, self.location(), e.to_string())),
        }
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }

        let suffix = format!(".{}", DOCUMENT_EXTENSION);
        let mut names = Vec::new();
        for entry in self.directory.read_dir_utf8()? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(&suffix) {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn location(&self) -> String {
        self.directory.to_string()
    }
}

/// In-memory configuration storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    documents: BTreeMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStorage for MemoryStorage {
    fn exists(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    fn read(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.documents.get(name).cloned())
    }

    fn write(&mut self, name: &str, data: &Value) -> Result<()> {
        check_name(name)?;
        self.documents.insert(name.to_string(), data.clone());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        Ok(self.documents.remove(name).is_some())
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .documents
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
