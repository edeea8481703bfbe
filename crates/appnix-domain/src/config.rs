//! `config.yml` model: shared defaults plus the list of website apps to build.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub defaults: Defaults,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Electron release the generated bundles are packaged against.
    #[serde(rename = "electron_version")]
    pub toolchain_version: String,
    pub lang: String,
    #[serde(rename = "spellcheck", default)]
    pub spellcheck_locales: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    /// Display name shown in menus.
    pub name: String,
    pub url: String,
    /// Icon basename under the icons directory, without the `.png` suffix.
    #[serde(default)]
    pub icon: Option<String>,
    /// Stable identifier used for folder names, binary names, and registry keys.
    pub app_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AppEntry {
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn icon_name(&self) -> &str {
        self.icon.as_deref().unwrap_or(&self.app_name)
    }
}

impl AppConfig {
    /// Case-insensitive lookup by identifier.
    pub fn find_app(&self, name: &str) -> Option<&AppEntry> {
        self.apps
            .iter()
            .find(|app| app.app_name.eq_ignore_ascii_case(name))
    }

    pub fn app_ids(&self) -> Vec<&str> {
        self.apps.iter().map(|app| app.app_name.as_str()).collect()
    }
}

/// Reads, parses, and validates the YAML config at `path`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let defaults = &config.defaults;
    if defaults.toolchain_version.trim().is_empty() {
        return Err(invalid("electron_version must be a non-empty string"));
    }
    if defaults.lang.trim().is_empty() {
        return Err(invalid("lang must be a non-empty string"));
    }
    if defaults
        .spellcheck_locales
        .iter()
        .any(|locale| locale.trim().is_empty())
    {
        return Err(invalid("spellcheck entries must be non-empty strings"));
    }
    if config.apps.is_empty() {
        return Err(invalid("no apps configured"));
    }

    let mut seen = HashSet::new();
    for app in &config.apps {
        validate_identifier(&app.app_name)?;
        if !seen.insert(app.app_name.to_ascii_lowercase()) {
            return Err(invalid(format!("duplicate app_name `{}`", app.app_name)));
        }
        if app.name.trim().is_empty() {
            return Err(invalid(format!("app `{}` is missing a name", app.app_name)));
        }
        let url = Url::parse(&app.url)
            .map_err(|err| invalid(format!("app `{}` has an invalid url: {err}", app.app_name)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "app `{}` url must use http or https",
                app.app_name
            )));
        }
    }
    Ok(())
}

fn validate_identifier(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(invalid("app_name must not be empty"));
    }
    if id.starts_with('.') {
        return Err(invalid(format!("app_name `{id}` must not start with '.'")));
    }
    let allowed = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.');
    if !id.chars().all(allowed) {
        return Err(invalid(format!(
            "app_name `{id}` may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
