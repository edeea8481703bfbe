use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use appnix_domain::AppEntry;

use crate::core::fs::{ensure_dir, set_mode};

/// Renders the freedesktop `[Desktop Entry]` launching `bin_path`.
#[must_use]
pub fn render_desktop_entry(app: &AppEntry, bin_path: &Path, icon_path: &Path) -> String {
    let mut entry = String::from("[Desktop Entry]\n");
    let _ = writeln!(entry, "Name={}", single_line(&app.name));
    let description = app.description_or_default();
    if !description.is_empty() {
        let _ = writeln!(entry, "Comment={}", single_line(description));
    }
    let _ = writeln!(entry, "Exec={}", quote_exec(&bin_path.display().to_string()));
    let _ = writeln!(entry, "Icon={}", single_line(&icon_path.display().to_string()));
    entry.push_str("Type=Application\n");
    entry.push_str("Terminal=false\n");
    let category = app.category_or_default();
    if !category.is_empty() {
        let _ = writeln!(entry, "Categories={};", single_line(category));
    }
    let _ = writeln!(entry, "StartupWMClass={}", single_line(&app.name));
    entry
}

/// Writes the desktop entry to `dest` with mode `0755` so launchers trust it.
pub fn write_desktop_entry(
    app: &AppEntry,
    bin_path: &Path,
    icon_path: &Path,
    dest: &Path,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::write(dest, render_desktop_entry(app, bin_path, icon_path))
        .with_context(|| format!("failed to write {}", dest.display()))?;
    set_mode(dest, 0o755)
}

/// A string value: one line, backslashes escaped.
fn single_line(value: &str) -> String {
    value.replace('\\', "\\\\").replace(['\n', '\r'], " ")
}

const EXEC_RESERVED: &[char] = &[
    '"', '\'', '\\', '>', '<', '~', '|', '&', ';', '$', '*', '?', '#', '(', ')', '`',
];

/// `Exec` program path. `%` is always doubled (field codes). Paths with whitespace or
/// reserved characters are double-quoted; inside the quotes `"`, `` ` ``, `$` and `\` get a
/// backslash, and every backslash is then doubled once more by string-value escaping.
fn quote_exec(path: &str) -> String {
    let needs_quotes = path
        .chars()
        .any(|ch| ch.is_whitespace() || EXEC_RESERVED.contains(&ch));
    if !needs_quotes {
        return path.replace('%', "%%");
    }
    let mut quoted = String::with_capacity(path.len() + 2);
    quoted.push('"');
    for ch in path.chars() {
        match ch {
            '"' | '`' | '$' => {
                quoted.push_str("\\\\");
                quoted.push(ch);
            }
            '\\' => quoted.push_str("\\\\\\\\"),
            '%' => quoted.push_str("%%"),
            '\n' | '\r' => quoted.push(' '),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
