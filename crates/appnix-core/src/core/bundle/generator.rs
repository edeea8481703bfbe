use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use super::desktop::write_desktop_entry;
use crate::core::effects::{BundleGenerator, BundleRequest};
use crate::core::fs::{ensure_dir, set_mode};

const MAIN_JS: &str = r#"const { app, BrowserWindow, shell } = require('electron');

const APP_URL = __APP_URL__;
const APP_NAME = __APP_NAME__;
const LANG = __LANG__;
const SPELLCHECK = __SPELLCHECK__;

app.commandLine.appendSwitch('lang', LANG);

function createWindow() {
  const win = new BrowserWindow({
    width: 1280,
    height: 800,
    title: APP_NAME,
    autoHideMenuBar: true,
    webPreferences: {
      contextIsolation: true,
      nodeIntegration: false,
      spellcheck: SPELLCHECK.length > 0,
    },
  });
  if (SPELLCHECK.length > 0) {
    win.webContents.session.setSpellCheckerLanguages(SPELLCHECK);
  }
  win.webContents.setWindowOpenHandler(({ url }) => {
    shell.openExternal(url);
    return { action: 'deny' };
  });
  win.loadURL(APP_URL);
}

const gotLock = app.requestSingleInstanceLock();
if (!gotLock) {
  app.quit();
} else {
  app.on('second-instance', () => {
    const [win] = BrowserWindow.getAllWindows();
    if (win) {
      if (win.isMinimized()) win.restore();
      win.focus();
    }
  });
  app.whenReady().then(createWindow);
  app.on('window-all-closed', () => app.quit());
}
"#;

/// Lays out a minimal Electron project (`package.json`, `main.js`) that wraps the app URL.
pub struct ElectronBundleGenerator;

impl BundleGenerator for ElectronBundleGenerator {
    fn generate(&self, request: &BundleRequest<'_>) -> Result<()> {
        let app = request.app;
        ensure_dir(request.staging_dir)?;

        let manifest = json!({
            "name": app.app_name,
            "productName": app.name,
            "version": "1.0.0",
            "description": app.description_or_default(),
            "main": "main.js",
            "devDependencies": {
                "electron": request.defaults.toolchain_version,
            },
        });
        let package_json = request.staging_dir.join("package.json");
        write_file(&package_json, &(serde_json::to_string_pretty(&manifest)? + "\n"))?;

        let main_js = request.staging_dir.join("main.js");
        write_file(&main_js, &render_main_js(request)?)?;

        write_desktop_entry(
            app,
            request.bin_path,
            request.icon_path,
            request.desktop_entry,
        )?;
        debug!(app = %app.app_name, dir = %request.staging_dir.display(), "generated Electron bundle");
        Ok(())
    }
}

fn render_main_js(request: &BundleRequest<'_>) -> Result<String> {
    let defaults = request.defaults;
    Ok(MAIN_JS
        .replace("__APP_URL__", &serde_json::to_string(&request.app.url)?)
        .replace("__APP_NAME__", &serde_json::to_string(&request.app.name)?)
        .replace("__LANG__", &serde_json::to_string(&defaults.lang)?)
        .replace(
            "__SPELLCHECK__",
            &serde_json::to_string(&defaults.spellcheck_locales)?,
        ))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    set_mode(path, 0o644)
}
