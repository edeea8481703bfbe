use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use appnix_domain::{InstalledAppRecord, InstalledRegistry};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::config::AppnixPaths;
use crate::core::fs::set_mode;

/// `installed.json`, the record of which apps are installed.
#[derive(Debug, Clone)]
pub struct InstalledStore {
    path: PathBuf,
}

impl InstalledStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn at(paths: &AppnixPaths) -> Self {
        Self::new(&paths.installed_file)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the registry. A missing or unreadable file reads as empty.
    #[must_use]
    pub fn read(&self) -> InstalledRegistry {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return InstalledRegistry::default(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "installed registry unreadable; treating as empty");
                return InstalledRegistry::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "installed registry is corrupt; treating as empty");
                InstalledRegistry::default()
            }
        }
    }

    /// Replaces the registry file atomically (temp file in the same directory, then rename).
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written or renamed into place.
    pub fn write(&self, registry: &InstalledRegistry) -> Result<()> {
        let parent = self
            .path
            .parent()
            .with_context(|| format!("{} has no parent directory", self.path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let contents = serde_json::to_string_pretty(registry)?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        tmp.write_all(contents.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        set_mode(tmp.path(), 0o644)?;
        tmp.persist(&self.path)
            .with_context(|| format!("writing installed registry at {}", self.path.display()))?;
        Ok(())
    }

    /// Inserts or replaces the record keyed by its `app_name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry cannot be written.
    pub fn register(&self, record: InstalledAppRecord) -> Result<()> {
        let mut registry = self.read();
        let app = record.app_name.clone();
        registry.upsert(record);
        self.write(&registry)?;
        debug!(app = %app, "registered");
        Ok(())
    }

    /// Removes `app_name`, returning the record if it was present. The file is only
    /// rewritten when something was removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry cannot be written.
    pub fn unregister(&self, app_name: &str) -> Result<Option<InstalledAppRecord>> {
        let mut registry = self.read();
        let removed = registry.remove(app_name);
        if removed.is_some() {
            self.write(&registry)?;
            debug!(app = app_name, "unregistered");
        }
        Ok(removed)
    }

    #[must_use]
    pub fn get(&self, app_name: &str) -> Option<InstalledAppRecord> {
        self.read().get(app_name).cloned()
    }
}
