#![deny(clippy::all)]

mod core;

pub use appnix_domain::{AppConfig, AppEntry, Defaults, InstalledAppRecord, InstalledRegistry};

pub use crate::core::apps::{
    build_everything, generate_desktop_entries, list_installed, uninstall_app, UninstallRequest,
};
pub use crate::core::build::{
    build_all, build_single_app, install_app, reinstall_app, BuildPhase, BuildRequest,
    InstallRequest, ReinstallRequest,
};
pub use crate::core::bundle::{render_desktop_entry, ElectronBuilderPackager, ElectronBundleGenerator};
pub use crate::core::config::context::{CommandContext, CommandGroup, CommandInfo};
pub use crate::core::config::{AppnixPaths, Config, GlobalOptions, APPNIX_CONFIG_ENV, APPNIX_HOME_ENV};
pub use crate::core::effects::{
    BundleGenerator, BundleRequest, Downloader, Effects, HttpDownloader, PackageRequest, Packager,
    ProcessRunner, SharedEffects, SystemEffects, SystemProcessRunner,
};
pub use crate::core::process::RunOutput;
pub use crate::core::registry::InstalledStore;
pub use crate::core::staging::StagingSession;
pub use crate::core::toolchain::{
    ensure_runtime_ready, is_valid_elf, CachedRuntime, APPIMAGE_TOOLCHAIN_VERSION,
};
pub use crate::core::tooling::errors::{error_outcome, AppnixError};
pub use crate::core::tooling::outcome::{to_json_response, CommandStatus, ExecutionOutcome};
