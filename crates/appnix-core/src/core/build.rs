//! Per-app build state machine and the sessions that drive it (fleet build, install,
//! reinstall).

use std::fmt;

use anyhow::{Context, Result};
use appnix_domain::{AppConfig, AppEntry, Defaults, InstalledAppRecord, InstalledPaths};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::core::config::context::CommandContext;
use crate::core::effects::{BundleRequest, PackageRequest};
use crate::core::fs::{install_executable, remove_dir_if_exists};
use crate::core::registry::InstalledStore;
use crate::core::staging::StagingSession;
use crate::core::toolchain::ensure_runtime_ready;
use crate::core::tooling::errors::AppnixError;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildPhase {
    Pending,
    GeneratingFiles,
    InstallingDependencies,
    Packaging,
    LocatingArtifact,
    Installing,
    Registering,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuildPhase::Pending => "preparing staging",
            BuildPhase::GeneratingFiles => "generating files",
            BuildPhase::InstallingDependencies => "installing dependencies",
            BuildPhase::Packaging => "packaging",
            BuildPhase::LocatingArtifact => "locating artifact",
            BuildPhase::Installing => "installing",
            BuildPhase::Registering => "registering",
            BuildPhase::CleaningUp => "cleaning up",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Default)]
pub struct BuildRequest {
    pub keep_cache: bool,
}

#[derive(Clone, Debug)]
pub struct InstallRequest {
    pub name: String,
    pub keep_cache: bool,
}

#[derive(Clone, Debug)]
pub struct ReinstallRequest {
    pub name: String,
}

/// Builds one app end to end and returns the record written to the registry.
///
/// Staging for the app is removed before this returns, whatever the outcome. The
/// runtime cache and the staging root are left alone.
///
/// # Errors
///
/// [`AppnixError::BuildStepFailed`] naming the phase that failed, or the artifact
/// errors from [`StagingSession::locate_artifact`].
pub fn build_single_app(
    ctx: &CommandContext<'_>,
    app: &AppEntry,
    defaults: &Defaults,
) -> Result<InstalledAppRecord> {
    info!(app = %app.app_name, "building {}", app.name);
    let session = StagingSession::acquire(ctx.paths(), &app.app_name)
        .map_err(|err| step_failure(app, BuildPhase::Pending, err))?;
    let mut phase = BuildPhase::Pending;
    let result = run_phases(ctx, app, defaults, &session, &mut phase);

    debug!(app = %app.app_name, phase = %BuildPhase::CleaningUp);
    session.release();

    match result {
        Ok(record) => {
            debug!(app = %app.app_name, phase = %BuildPhase::Done);
            info!(app = %app.app_name, bin = %record.paths.bin.display(), "installed");
            Ok(record)
        }
        Err(err) => {
            warn!(app = %app.app_name, %phase, "build {}", BuildPhase::Failed);
            Err(step_failure(app, phase, err))
        }
    }
}

fn run_phases(
    ctx: &CommandContext<'_>,
    app: &AppEntry,
    defaults: &Defaults,
    session: &StagingSession,
    phase: &mut BuildPhase,
) -> Result<InstalledAppRecord> {
    let paths = ctx.paths();
    let effects = ctx.effects();
    let bin_path = paths.bin_path(&app.app_name);
    let desktop_entry = paths.desktop_entry_path(&app.app_name);
    let icon_path = paths.icon_path(&app.app_name);
    let package_icon = paths.icon_path(app.icon_name());

    *phase = BuildPhase::GeneratingFiles;
    debug!(app = %app.app_name, phase = %phase);
    effects.bundler().generate(&BundleRequest {
        app,
        defaults,
        staging_dir: session.staging_dir(),
        bin_path: &bin_path,
        icon_path: &icon_path,
        desktop_entry: &desktop_entry,
    })?;

    let package = PackageRequest {
        app,
        defaults,
        staging_dir: session.staging_dir(),
        output_dir: session.output_dir(),
        icon_path: &package_icon,
        cache_root: &paths.cache_root,
    };
    *phase = BuildPhase::InstallingDependencies;
    debug!(app = %app.app_name, phase = %phase);
    effects.packager().install_dependencies(&package)?;

    *phase = BuildPhase::Packaging;
    debug!(app = %app.app_name, phase = %phase);
    effects.packager().package(&package)?;

    *phase = BuildPhase::LocatingArtifact;
    let artifact = session.locate_artifact()?;
    debug!(app = %app.app_name, artifact = %artifact.display(), "found AppImage");

    *phase = BuildPhase::Installing;
    install_executable(&artifact, &bin_path)?;

    *phase = BuildPhase::Registering;
    let record = InstalledAppRecord {
        name: app.name.clone(),
        app_name: app.app_name.clone(),
        url: app.url.clone(),
        category: app.category_or_default().to_string(),
        description: app.description_or_default().to_string(),
        paths: InstalledPaths {
            bin: bin_path,
            desktop: desktop_entry,
            icon: icon_path.is_file().then_some(icon_path),
        },
        installed_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format install timestamp")?,
    };
    InstalledStore::at(paths).register(record.clone())?;
    Ok(record)
}

fn step_failure(app: &AppEntry, phase: BuildPhase, err: anyhow::Error) -> anyhow::Error {
    if err.downcast_ref::<AppnixError>().is_some() {
        return err;
    }
    AppnixError::BuildStepFailed {
        app: app.app_name.clone(),
        phase,
        source: err.into(),
    }
    .into()
}

/// Builds every configured app, stopping at the first failure.
///
/// # Errors
///
/// Returns the first configuration, provisioning, or per-app build error.
pub fn build_all(ctx: &CommandContext<'_>, request: &BuildRequest) -> Result<ExecutionOutcome> {
    let config = ctx.load_app_config()?;
    let built = build_fleet(ctx, &config, request.keep_cache)?;
    Ok(ExecutionOutcome::success(
        "All apps built and installed successfully.",
        json!({ "apps": built, "keep_cache": request.keep_cache }),
    ))
}

pub(crate) fn build_fleet(
    ctx: &CommandContext<'_>,
    config: &AppConfig,
    keep_cache: bool,
) -> Result<Vec<InstalledAppRecord>> {
    run_session(ctx, keep_cache, || {
        let mut built = Vec::with_capacity(config.apps.len());
        for app in &config.apps {
            built.push(build_single_app(ctx, app, &config.defaults)?);
        }
        Ok(built)
    })
}

/// Builds and installs a single configured app, matched case-insensitively.
///
/// # Errors
///
/// [`AppnixError::AppNotFound`] when no configured app matches, otherwise any error
/// from provisioning or the build.
pub fn install_app(ctx: &CommandContext<'_>, request: &InstallRequest) -> Result<ExecutionOutcome> {
    let config = ctx.load_app_config()?;
    let app = resolve_app(&config, &request.name)?;
    let record = install_resolved(ctx, &config, app, request.keep_cache)?;
    Ok(ExecutionOutcome::success(
        format!("{} built and installed successfully.", app.name),
        json!({ "app": record }),
    ))
}

/// Stops running copies of the app, drops its registry entry, and installs it again.
///
/// # Errors
///
/// Same as [`install_app`].
pub fn reinstall_app(
    ctx: &CommandContext<'_>,
    request: &ReinstallRequest,
) -> Result<ExecutionOutcome> {
    let config = ctx.load_app_config()?;
    let app = resolve_app(&config, &request.name)?;
    let paths = ctx.paths();

    terminate_running(ctx, &paths.bin_path(&app.app_name));
    match InstalledStore::at(paths).unregister(&app.app_name)? {
        Some(_) => debug!(app = %app.app_name, "removed previous registry entry"),
        None => debug!(app = %app.app_name, "was not installed"),
    }

    let record = install_resolved(ctx, &config, app, false)?;
    Ok(ExecutionOutcome::success(
        format!("{} reinstalled successfully.", app.name),
        json!({ "app": record }),
    ))
}

fn resolve_app<'c>(config: &'c AppConfig, name: &str) -> Result<&'c AppEntry> {
    config.find_app(name).ok_or_else(|| {
        AppnixError::AppNotFound {
            name: name.to_string(),
            available: config.app_ids().into_iter().map(str::to_string).collect(),
        }
        .into()
    })
}

fn install_resolved(
    ctx: &CommandContext<'_>,
    config: &AppConfig,
    app: &AppEntry,
    keep_cache: bool,
) -> Result<InstalledAppRecord> {
    run_session(ctx, keep_cache, || {
        build_single_app(ctx, app, &config.defaults)
    })
}

/// Ensures the runtime once, runs `body`, then clears the staging root (and the runtime
/// cache unless `keep_cache`). On failure only the staging root is cleared.
fn run_session<T>(
    ctx: &CommandContext<'_>,
    keep_cache: bool,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let paths = ctx.paths();
    let result = ensure_runtime_ready(ctx.runtime(), ctx.effects()).and_then(|()| body());
    remove_best_effort(&paths.staging_root, "staging root");
    if result.is_ok() && !keep_cache {
        remove_best_effort(ctx.runtime().cache_dir(), "AppImage toolchain cache");
    }
    result
}

fn remove_best_effort(dir: &std::path::Path, what: &str) {
    if let Err(err) = remove_dir_if_exists(dir) {
        warn!(path = %dir.display(), error = %format!("{err:#}"), "failed to remove {what}");
    }
}

/// `pkill -f` against the installed binary path; a missing `pkill` or no match is fine.
fn terminate_running(ctx: &CommandContext<'_>, bin_path: &std::path::Path) {
    let process = ctx.effects().process();
    let Some(pkill) = process.find_program("pkill") else {
        debug!("pkill not found; not stopping running instances");
        return;
    };
    let pattern = escape_regex(&bin_path.display().to_string());
    let args = vec!["-f".to_string(), pattern];
    let cwd = &ctx.paths().config_root;
    let cwd = if cwd.is_dir() {
        cwd.as_path()
    } else {
        std::path::Path::new("/")
    };
    match process.run(&pkill.display().to_string(), &args, &[], cwd) {
        Ok(output) if output.code == 0 => info!(bin = %bin_path.display(), "stopped running instances"),
        Ok(output) => debug!(code = output.code, "no running instances"),
        Err(err) => warn!(error = %err, "failed to run pkill"),
    }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(
            ch,
            '\\' | '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
