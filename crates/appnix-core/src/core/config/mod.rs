//! Global options, the environment snapshot, and every path appnix touches.

pub mod context;

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};

use crate::core::toolchain::CachedRuntime;

/// Replaces `$HOME` as the base of every appnix path.
pub const APPNIX_HOME_ENV: &str = "APPNIX_HOME";
/// Points at an alternate `config.yml`.
pub const APPNIX_CONFIG_ENV: &str = "APPNIX_CONFIG";

/// Command-line options the core acts on. Output and logging flags stay in the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    /// `--config`, which beats `APPNIX_CONFIG`.
    pub config: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self::from_pairs(env::vars_os())
    }

    /// Keeps only pairs that are valid UTF-8; appnix reads none that aren't.
    fn from_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = pairs
            .into_iter()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        Self::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        )
    }
}

/// Filesystem layout, computed once at start-up and passed to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppnixPaths {
    pub config_root: PathBuf,
    pub config_file: PathBuf,
    pub bin_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub staging_root: PathBuf,
    pub installed_file: PathBuf,
    pub desktop_dir: PathBuf,
    /// electron-builder's cache root; the AppImage toolchain lives beneath it.
    pub cache_root: PathBuf,
}

impl AppnixPaths {
    #[must_use]
    pub fn from_home(home: &Path) -> Self {
        let config_root = home.join(".config").join("appnix");
        Self {
            config_file: config_root.join("config.yml"),
            bin_dir: config_root.join("bin"),
            icons_dir: config_root.join("icons"),
            staging_root: config_root.join(".build"),
            installed_file: config_root.join("installed.json"),
            desktop_dir: home.join(".local").join("share").join("applications"),
            cache_root: home.join(".cache").join("electron-builder"),
            config_root,
        }
    }

    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self
    }

    #[must_use]
    pub fn staging_dir(&self, app_name: &str) -> PathBuf {
        self.staging_root.join(app_name)
    }

    #[must_use]
    pub fn output_dir(&self, app_name: &str) -> PathBuf {
        self.staging_root.join(format!("{app_name}-out"))
    }

    #[must_use]
    pub fn bin_path(&self, app_name: &str) -> PathBuf {
        self.bin_dir.join(app_name)
    }

    #[must_use]
    pub fn icon_path(&self, icon_name: &str) -> PathBuf {
        self.icons_dir.join(format!("{icon_name}.png"))
    }

    #[must_use]
    pub fn desktop_entry_path(&self, app_name: &str) -> PathBuf {
        self.desktop_dir.join(format!("{app_name}.desktop"))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    paths: AppnixPaths,
    runtime: CachedRuntime,
}

impl Config {
    /// Builds the configuration from the current process environment.
    ///
    /// # Errors
    /// Returns an error if no home directory can be determined.
    pub fn from_env(config_override: Option<&str>) -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture(), config_override)
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot, config_override: Option<&str>) -> Result<Self> {
        let home = match snapshot.var(APPNIX_HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => home_dir().ok_or_else(|| anyhow!("home directory not found"))?,
        };
        let mut paths = AppnixPaths::from_home(&home);
        if let Some(file) = config_override.or_else(|| snapshot.var(APPNIX_CONFIG_ENV)) {
            paths = paths.with_config_file(file);
        }
        Ok(Self::from_paths(paths))
    }

    #[must_use]
    pub fn from_paths(paths: AppnixPaths) -> Self {
        let runtime = CachedRuntime::pinned(&paths.cache_root);
        Self { paths, runtime }
    }

    #[must_use]
    pub fn paths(&self) -> &AppnixPaths {
        &self.paths
    }

    #[must_use]
    pub fn runtime(&self) -> &CachedRuntime {
        &self.runtime
    }
}
