#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::{json, Value};
use tempfile::TempDir;

/// `appnix` with every path rebased under `home`.
pub fn appnix(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("appnix");
    cmd.env("APPNIX_HOME", home)
        .env_remove("APPNIX_CONFIG")
        .env("NO_COLOR", "1");
    cmd
}

pub fn sandbox() -> TempDir {
    tempfile::Builder::new()
        .prefix("appnix-cli")
        .tempdir()
        .expect("tempdir")
}

pub fn config_root(home: &Path) -> PathBuf {
    home.join(".config").join("appnix")
}

pub fn write_config(home: &Path, ids: &[&str]) -> PathBuf {
    let mut yaml = String::from(
        "defaults:\n  electron_version: \"33.2.0\"\n  lang: en-US\n  spellcheck:\n    - en-US\napps:\n",
    );
    for id in ids {
        yaml.push_str(&format!(
            "  - name: {id}\n    url: https://{id}.example.org\n    app_name: {id}\n    category: Network\n"
        ));
    }
    let path = config_root(home).join("config.yml");
    fs::create_dir_all(path.parent().expect("config parent")).expect("config dir");
    fs::write(&path, yaml).expect("write config");
    path
}

/// Seeds `installed.json` with one record whose binary and desktop entry exist.
pub fn seed_installed(home: &Path, id: &str) -> Value {
    let root = config_root(home);
    let bin = root.join("bin").join(id);
    let desktop = home
        .join(".local")
        .join("share")
        .join("applications")
        .join(format!("{id}.desktop"));
    fs::create_dir_all(bin.parent().expect("bin parent")).expect("bin dir");
    fs::create_dir_all(desktop.parent().expect("desktop parent")).expect("desktop dir");
    fs::write(&bin, b"\x7fELF").expect("write bin");
    fs::write(&desktop, "[Desktop Entry]\n").expect("write desktop");
    let record = json!({
        "name": "Wikipedia",
        "app_name": id,
        "url": format!("https://{id}.example.org"),
        "category": "Education",
        "description": "",
        "paths": {
            "bin": bin,
            "desktop": desktop,
            "icon": null,
        },
        "installedAt": "2026-03-01T12:00:00.000Z",
    });
    let registry = json!({ id: record.clone() });
    fs::write(
        root.join("installed.json"),
        serde_json::to_string_pretty(&registry).expect("serialize"),
    )
    .expect("write registry");
    record
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stderr(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

/// Seeds a valid AppImage toolchain cache so builds skip provisioning.
pub fn seed_toolchain(home: &Path) {
    let dir = home
        .join(".cache")
        .join("electron-builder")
        .join("appimage")
        .join("appimage-12.0.1");
    fs::create_dir_all(dir.join("linux-x64")).expect("toolchain dir");
    let mut elf = vec![0x7f, b'E', b'L', b'F', 2, 1, 1, 0];
    elf.resize(64, 0);
    fs::write(dir.join("runtime-x64"), elf).expect("write runtime");
    fs::write(dir.join("linux-x64").join("mksquashfs"), b"#!/bin/sh\n").expect("write mksquashfs");
}

/// Writes an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir).expect("tool dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write tool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod tool");
}

/// `PATH` with `dir` in front of the inherited value.
pub fn path_with(dir: &Path) -> std::ffi::OsString {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(existing) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(entries).expect("join PATH")
}
