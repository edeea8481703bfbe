use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::core::build::{build_fleet, BuildRequest};
use crate::core::bundle::write_desktop_entry;
use crate::core::config::context::CommandContext;
use crate::core::fs::remove_file_if_exists;
use crate::core::registry::InstalledStore;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Debug)]
pub struct UninstallRequest {
    pub name: String,
}

/// Lists every registered app.
///
/// # Errors
/// Never fails today; the registry reads as empty when missing or corrupt.
pub fn list_installed(ctx: &CommandContext<'_>) -> Result<ExecutionOutcome> {
    let registry = InstalledStore::at(ctx.paths()).read();
    if registry.is_empty() {
        return Ok(ExecutionOutcome::success(
            "No apps installed.",
            json!({ "apps": [] }),
        ));
    }
    let mut message = String::new();
    for record in registry.records() {
        if !message.is_empty() {
            message.push('\n');
        }
        let _ = writeln!(message, "{} ({})", record.name, record.app_name);
        let _ = writeln!(message, "  URL:       {}", record.url);
        if !record.category.is_empty() {
            let _ = writeln!(message, "  Category:  {}", record.category);
        }
        let _ = writeln!(message, "  Binary:    {}", record.paths.bin.display());
        let _ = writeln!(message, "  Installed: {}", record.installed_at);
    }
    let apps: Vec<_> = registry.records().collect();
    Ok(ExecutionOutcome::success(
        message.trim_end().to_string(),
        json!({ "apps": apps }),
    ))
}

/// Removes an installed app's binary, desktop entry, and icon, then its registry entry.
///
/// Uninstalling something that is not installed succeeds with a `not_installed` reason.
/// The record is only dropped once every file is gone, so a failed removal can be retried.
///
/// # Errors
/// Returns an error if a file cannot be removed or the registry cannot be rewritten.
pub fn uninstall_app(
    ctx: &CommandContext<'_>,
    request: &UninstallRequest,
) -> Result<ExecutionOutcome> {
    let store = InstalledStore::at(ctx.paths());
    let found = store
        .read()
        .records()
        .find(|record| record.app_name.eq_ignore_ascii_case(&request.name))
        .cloned();
    let Some(record) = found else {
        return Ok(ExecutionOutcome::success(
            format!("\"{}\" is not installed.", request.name),
            json!({ "reason": "not_installed", "app": request.name }),
        ));
    };

    let mut removed_files = Vec::new();
    let files = [
        Some(&record.paths.bin),
        Some(&record.paths.desktop),
        record.paths.icon.as_ref(),
    ];
    for path in files.into_iter().flatten() {
        if remove_file_if_exists(path)
            .with_context(|| format!("uninstalling {}", record.app_name))?
        {
            debug!(path = %path.display(), "removed");
            removed_files.push(path.clone());
        }
    }
    store.unregister(&record.app_name)?;
    info!(app = %record.app_name, "uninstalled");
    Ok(ExecutionOutcome::success(
        format!("Uninstalled {} ({}).", record.name, record.app_name),
        json!({ "app": record, "removed": removed_files }),
    ))
}

/// Writes a desktop entry for every configured app, installed or not.
///
/// # Errors
/// Returns an error if the config is invalid or an entry cannot be written.
pub fn generate_desktop_entries(ctx: &CommandContext<'_>) -> Result<ExecutionOutcome> {
    let config = ctx.load_app_config()?;
    let paths = ctx.paths();
    let mut written = Vec::with_capacity(config.apps.len());
    for app in &config.apps {
        let dest = paths.desktop_entry_path(&app.app_name);
        write_desktop_entry(
            app,
            &paths.bin_path(&app.app_name),
            &paths.icon_path(&app.app_name),
            &dest,
        )?;
        debug!(app = %app.app_name, path = %dest.display(), "wrote desktop entry");
        written.push(dest);
    }
    Ok(ExecutionOutcome::success(
        format!("Generated {} desktop entries.", written.len()),
        json!({ "entries": written }),
    ))
}

/// Fleet build followed by desktop-entry generation.
///
/// # Errors
/// Returns the first build error; desktop entries are only written after every app built.
pub fn build_everything(
    ctx: &CommandContext<'_>,
    request: &BuildRequest,
) -> Result<ExecutionOutcome> {
    let config = ctx.load_app_config()?;
    let built = build_fleet(ctx, &config, request.keep_cache)?;
    let desktop = generate_desktop_entries(ctx)?;
    Ok(ExecutionOutcome::success(
        format!(
            "Built and installed {} apps. {}",
            built.len(),
            desktop.message
        ),
        json!({ "apps": built, "entries": desktop.details["entries"] }),
    ))
}
