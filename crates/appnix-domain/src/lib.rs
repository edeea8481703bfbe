#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod config;
pub mod installed;

pub use config::{load_config, validate_config, AppConfig, AppEntry, ConfigError, Defaults};
pub use installed::{InstalledAppRecord, InstalledPaths, InstalledRegistry};
