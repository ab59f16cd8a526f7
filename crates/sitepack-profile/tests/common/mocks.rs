//! Hand-written collaborators for orchestrator tests

#![allow(dead_code)]

use camino::Utf8Path;
use serde_yaml_ng::Value;
use sitepack_core::types::{Extension, ExtensionKind, EXTENSION_SET_DOCUMENT};
use sitepack_core::{ConfigStorage, Error, Result};
use sitepack_profile::{
    Confirmation, ConfigExport, ExportOutcome, ExtensionRegistry, InvalidationPhase,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Confirmation with a fixed answer that counts prompts
#[derive(Clone, Default)]
pub struct FixedConfirmation {
    answer: bool,
    prompts: Arc<AtomicUsize>,
}

impl FixedConfirmation {
    pub fn accept() -> Self {
        Self {
            answer: true,
            prompts: Arc::default(),
        }
    }

    pub fn decline() -> Self {
        Self {
            answer: false,
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl Confirmation for FixedConfirmation {
    fn confirm(&self, _prompt: &str) -> std::result::Result<bool, String> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer)
    }
}

/// Export that always fails with the given diagnostics
pub struct FailingExport {
    pub diagnostics: String,
}

impl FailingExport {
    pub fn new(diagnostics: &str) -> Self {
        Self {
            diagnostics: diagnostics.to_string(),
        }
    }
}

impl ConfigExport for FailingExport {
    fn export_to(&self, _destination: &Utf8Path) -> ExportOutcome {
        ExportOutcome::failed(self.diagnostics.clone())
    }

    fn describe(&self) -> String {
        "failing export".to_string()
    }
}

/// Registry wrapper that records invalidation phases
pub struct RecordingRegistry<R> {
    inner: R,
    pub phases: Rc<RefCell<Vec<InvalidationPhase>>>,
    fail_invalidation: bool,
}

impl<R: ExtensionRegistry> RecordingRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            phases: Rc::default(),
            fail_invalidation: false,
        }
    }

    pub fn failing_invalidation(mut self) -> Self {
        self.fail_invalidation = true;
        self
    }
}

impl<R: ExtensionRegistry> ExtensionRegistry for RecordingRegistry<R> {
    fn list(&mut self, kind: ExtensionKind) -> Result<BTreeMap<String, Extension>> {
        self.inner.list(kind)
    }

    fn refresh(&mut self) -> Result<()> {
        self.inner.refresh()
    }

    fn invalidate(&mut self, phase: InvalidationPhase) -> Result<()> {
        self.phases.borrow_mut().push(phase);
        if self.fail_invalidation {
            return Err(Error::invalid_config("cache backend unavailable"));
        }
        self.inner.invalidate(phase)
    }
}

/// Live store wrapper whose writes to `core.extension` fail
pub struct ReadOnlyExtensionSet<S> {
    pub inner: S,
}

impl<S: ConfigStorage> ConfigStorage for ReadOnlyExtensionSet<S> {
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn read(&self, name: &str) -> Result<Option<Value>> {
        self.inner.read(name)
    }

    fn write(&mut self, name: &str, data: &Value) -> Result<()> {
        if name == EXTENSION_SET_DOCUMENT {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "store is read-only",
            )));
        }
        self.inner.write(name, data)
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        self.inner.delete(name)
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_all(prefix)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Live store wrapper that loses `core.extension` once it has been written
///
/// Models a store that accepts the switch but can't serve it back, which
/// leaves the site switched and the snapshot unreconciled.
pub struct UnreadableAfterWrite<S> {
    pub inner: S,
    written: bool,
}

impl<S> UnreadableAfterWrite<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            written: false,
        }
    }
}

impl<S: ConfigStorage> ConfigStorage for UnreadableAfterWrite<S> {
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn read(&self, name: &str) -> Result<Option<Value>> {
        if self.written && name == EXTENSION_SET_DOCUMENT {
            return Err(Error::Io(std::io::Error::other("connection lost")));
        }
        self.inner.read(name)
    }

    fn write(&mut self, name: &str, data: &Value) -> Result<()> {
        self.inner.write(name, data)?;
        if name == EXTENSION_SET_DOCUMENT {
            self.written = true;
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        self.inner.delete(name)
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_all(prefix)
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}
