//! The AppImage toolchain electron-builder needs (`runtime-x64` plus `mksquashfs`),
//! cached per version under the electron-builder cache root.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info, warn};

use crate::core::effects::Effects;
use crate::core::fs::{ensure_dir, remove_dir_if_exists, remove_file_if_exists};
use crate::core::tooling::errors::AppnixError;

pub const APPIMAGE_TOOLCHAIN_VERSION: &str = "appimage-12.0.1";
const RELEASE_REPO: &str = "electron-userland/electron-builder-binaries";
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRuntime {
    version: String,
    cache_dir: PathBuf,
}

impl CachedRuntime {
    #[must_use]
    pub fn new(cache_root: &Path, version: &str) -> Self {
        Self {
            version: version.to_string(),
            cache_dir: cache_root.join("appimage").join(version),
        }
    }

    /// The toolchain version this build of appnix is known to work with.
    #[must_use]
    pub fn pinned(cache_root: &Path) -> Self {
        Self::new(cache_root, APPIMAGE_TOOLCHAIN_VERSION)
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    #[must_use]
    pub fn runtime_path(&self) -> PathBuf {
        self.cache_dir.join("runtime-x64")
    }

    #[must_use]
    pub fn mksquashfs_path(&self) -> PathBuf {
        self.cache_dir.join("linux-x64").join("mksquashfs")
    }

    #[must_use]
    pub fn archive_name(&self) -> String {
        format!("{}.7z", self.version)
    }

    #[must_use]
    pub fn download_url(&self) -> String {
        format!(
            "https://github.com/{RELEASE_REPO}/releases/download/{version}/{archive}",
            version = self.version,
            archive = self.archive_name()
        )
    }

    #[must_use]
    pub fn release_page_url(&self) -> String {
        format!(
            "https://github.com/{RELEASE_REPO}/releases/tag/{}",
            self.version
        )
    }

    /// Both artifacts exist and the runtime is an ELF executable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_elf(&self.runtime_path()) && self.mksquashfs_path().is_file()
    }
}

/// Returns true when `path` is a readable file starting with the ELF magic bytes.
#[must_use]
pub fn is_valid_elf(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut header = [0_u8; 4];
    match file.read_exact(&mut header) {
        Ok(()) => header == ELF_MAGIC,
        Err(_) => false,
    }
}

/// Makes sure the pinned AppImage toolchain is present and valid in the cache.
///
/// Performs no network access when the cache is already valid. Otherwise downloads the
/// release archive once, extracts it with `7z`, and re-validates.
///
/// # Errors
///
/// Returns [`AppnixError::RuntimeProvisioningFailed`] when `7z` is missing or the
/// download, extraction, or validation fails.
pub fn ensure_runtime_ready(runtime: &CachedRuntime, effects: &dyn Effects) -> Result<()> {
    if runtime.is_valid() {
        debug!(dir = %runtime.cache_dir().display(), "AppImage toolchain cache is valid");
        return Ok(());
    }
    info!(version = runtime.version(), "provisioning AppImage toolchain");

    let Some(seven_zip) = effects.process().find_program("7z") else {
        return Err(AppnixError::RuntimeProvisioningFailed {
            reason: "7z was not found on PATH".to_string(),
            remediation: "install p7zip (e.g. `sudo apt install p7zip-full` or `sudo dnf install p7zip p7zip-plugins`) and retry"
                .to_string(),
        }
        .into());
    };

    if let Err(err) = provision(runtime, effects, &seven_zip) {
        if let Err(cleanup) = remove_dir_if_exists(runtime.cache_dir()) {
            warn!(error = %cleanup, "failed to remove partial toolchain cache");
        }
        let reason = format!("{err:#}");
        return Err(AppnixError::RuntimeProvisioningFailed {
            reason,
            remediation: format!(
                "download {} (listed on {}) manually and extract it into {}",
                runtime.download_url(),
                runtime.release_page_url(),
                runtime.cache_dir().display()
            ),
        }
        .into());
    }
    info!(dir = %runtime.cache_dir().display(), "AppImage toolchain ready");
    Ok(())
}

fn provision(runtime: &CachedRuntime, effects: &dyn Effects, seven_zip: &Path) -> Result<()> {
    let cache_dir = runtime.cache_dir();
    ensure_dir(cache_dir)?;
    let archive = cache_dir.join(runtime.archive_name());

    download_archive(runtime, effects, &archive)?;

    let args = vec![
        "x".to_string(),
        "-y".to_string(),
        format!("-o{}", cache_dir.display()),
        archive.display().to_string(),
    ];
    let program = seven_zip.display().to_string();
    let output = effects
        .process()
        .run(&program, &args, &[], cache_dir)
        .context("failed to run 7z")?;
    if !output.success() {
        bail!(
            "7z exited with status {}: {}",
            output.code,
            output.stderr.trim()
        );
    }
    remove_file_if_exists(&archive)?;

    if !runtime.is_valid() {
        return Err(anyhow!(
            "extracted toolchain is incomplete (expected {} and {})",
            runtime.runtime_path().display(),
            runtime.mksquashfs_path().display()
        ));
    }
    Ok(())
}

fn download_archive(runtime: &CachedRuntime, effects: &dyn Effects, archive: &Path) -> Result<()> {
    if let Some(gh) = effects.process().find_program("gh") {
        let cache_dir = runtime.cache_dir();
        let args = vec![
            "release".to_string(),
            "download".to_string(),
            runtime.version().to_string(),
            "--repo".to_string(),
            RELEASE_REPO.to_string(),
            "--pattern".to_string(),
            runtime.archive_name(),
            "--dir".to_string(),
            cache_dir.display().to_string(),
            "--clobber".to_string(),
        ];
        match effects
            .process()
            .run(&gh.display().to_string(), &args, &[], cache_dir)
        {
            Ok(output) if output.success() && archive.is_file() => return Ok(()),
            Ok(output) => {
                warn!(
                    code = output.code,
                    stderr = output.stderr.trim(),
                    "gh release download failed; falling back to HTTPS"
                );
            }
            Err(err) => warn!(error = %err, "gh release download failed; falling back to HTTPS"),
        }
    }
    let url = runtime.download_url();
    debug!(%url, dest = %archive.display(), "downloading");
    effects.downloader().download(&url, archive)
}
