use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use appnix_domain::{AppEntry, Defaults};
use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use super::bundle::{ElectronBuilderPackager, ElectronBundleGenerator};
use super::process::{run_command, run_command_passthrough, RunOutput};

const APPNIX_VERSION: &str = env!("CARGO_PKG_VERSION");
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput>;
    fn run_passthrough(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput>;
    fn find_program(&self, name: &str) -> Option<PathBuf>;
}

pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Everything the bundle generator needs to lay out one app's staging directory.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    pub app: &'a AppEntry,
    pub defaults: &'a Defaults,
    pub staging_dir: &'a Path,
    pub bin_path: &'a Path,
    pub icon_path: &'a Path,
    pub desktop_entry: &'a Path,
}

pub trait BundleGenerator: Send + Sync {
    fn generate(&self, request: &BundleRequest<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    pub app: &'a AppEntry,
    pub defaults: &'a Defaults,
    pub staging_dir: &'a Path,
    pub output_dir: &'a Path,
    pub icon_path: &'a Path,
    pub cache_root: &'a Path,
}

pub trait Packager: Send + Sync {
    fn install_dependencies(&self, request: &PackageRequest<'_>) -> Result<()>;
    fn package(&self, request: &PackageRequest<'_>) -> Result<()>;
}

pub trait Effects: Send + Sync {
    fn process(&self) -> &dyn ProcessRunner;
    fn downloader(&self) -> &dyn Downloader;
    fn bundler(&self) -> &dyn BundleGenerator;
    fn packager(&self) -> &dyn Packager;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    process: Arc<SystemProcessRunner>,
    downloader: Arc<HttpDownloader>,
    bundler: Arc<ElectronBundleGenerator>,
    packager: Arc<ElectronBuilderPackager>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        let process = Arc::new(SystemProcessRunner);
        Self {
            packager: Arc::new(ElectronBuilderPackager::new(process.clone())),
            process,
            downloader: Arc::new(HttpDownloader),
            bundler: Arc::new(ElectronBundleGenerator),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn process(&self) -> &dyn ProcessRunner {
        self.process.as_ref()
    }

    fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }

    fn bundler(&self) -> &dyn BundleGenerator {
        self.bundler.as_ref()
    }

    fn packager(&self) -> &dyn Packager {
        self.packager.as_ref()
    }
}

pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        tracing::debug!(program, args = ?args, cwd = %cwd.display(), "running");
        run_command(program, args, env, cwd)
    }

    fn run_passthrough(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        tracing::debug!(program, args = ?args, cwd = %cwd.display(), "running");
        run_command_passthrough(program, args, env, cwd)
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Plain HTTPS download used when the `gh` CLI is unavailable.
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let parent = dest
            .parent()
            .with_context(|| format!("{} has no parent directory", dest.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let client = http_client()?;
        let mut response = client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        response
            .copy_to(tmp.as_file_mut())
            .with_context(|| format!("failed to download {url}"))?;
        tmp.persist(dest)
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(())
    }
}

fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(format!("appnix/{APPNIX_VERSION}"))
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}
