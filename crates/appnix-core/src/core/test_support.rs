use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use appnix_domain::{AppEntry, Defaults, InstalledAppRecord, InstalledPaths};
use tempfile::TempDir;

use crate::core::bundle::ElectronBundleGenerator;
use crate::core::config::context::CommandContext;
use crate::core::config::{AppnixPaths, Config, GlobalOptions};
use crate::core::effects::{
    BundleGenerator, Downloader, Effects, PackageRequest, Packager, ProcessRunner,
};
use crate::core::process::RunOutput;
use crate::core::toolchain::CachedRuntime;

pub(crate) fn elf_bytes() -> Vec<u8> {
    let mut bytes = vec![0x7f, b'E', b'L', b'F', 2, 1, 1, 0];
    bytes.resize(64, 0);
    bytes
}

fn title_case(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn sample_app(id: &str) -> AppEntry {
    AppEntry {
        name: title_case(id),
        url: format!("https://{id}.example.org"),
        icon: None,
        app_name: id.to_string(),
        category: Some("Education".to_string()),
        description: Some(format!("{} in a window", title_case(id))),
    }
}

pub(crate) fn sample_defaults() -> Defaults {
    Defaults {
        toolchain_version: "33.2.0".to_string(),
        lang: "en-US".to_string(),
        spellcheck_locales: vec!["en-US".to_string(), "de".to_string()],
    }
}

pub(crate) fn sample_record(id: &str, home: &Path) -> InstalledAppRecord {
    let paths = AppnixPaths::from_home(home);
    InstalledAppRecord {
        name: title_case(id),
        app_name: id.to_string(),
        url: format!("https://{id}.example.org"),
        category: "Education".to_string(),
        description: String::new(),
        paths: InstalledPaths {
            bin: paths.bin_path(id),
            desktop: paths.desktop_entry_path(id),
            icon: None,
        },
        installed_at: "2026-03-01T12:00:00Z".to_string(),
    }
}

/// Writes a `config.yml` listing `ids` in order.
pub(crate) fn write_config(paths: &AppnixPaths, ids: &[&str]) {
    let mut yaml = String::from(
        "defaults:\n  electron_version: \"33.2.0\"\n  lang: en-US\n  spellcheck:\n    - en-US\napps:\n",
    );
    for id in ids {
        let app = sample_app(id);
        yaml.push_str(&format!(
            "  - name: {}\n    url: {}\n    app_name: {}\n    category: Education\n",
            app.name, app.url, app.app_name
        ));
    }
    fs::create_dir_all(paths.config_file.parent().unwrap()).unwrap();
    fs::write(&paths.config_file, yaml).unwrap();
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
}

type Handler = Box<dyn FnMut(&str, &[String]) -> i32 + Send>;

#[derive(Default)]
pub(crate) struct FakeProcess {
    calls: Mutex<Vec<RecordedCall>>,
    programs: Mutex<HashSet<String>>,
    handler: Mutex<Option<Handler>>,
}

impl FakeProcess {
    pub(crate) fn add_program(&self, name: &str) {
        self.programs.lock().unwrap().insert(name.to_string());
    }

    /// Installs a handler deciding each run's exit code (default 0).
    pub(crate) fn on_run(&self, handler: impl FnMut(&str, &[String]) -> i32 + Send + 'static) {
        *self.handler.lock().unwrap() = Some(Box::new(handler));
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> RunOutput {
        self.calls.lock().unwrap().push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            env: env.to_vec(),
            cwd: cwd.to_path_buf(),
        });
        let code = match self.handler.lock().unwrap().as_mut() {
            Some(handler) => handler(program, args),
            None => 0,
        };
        RunOutput {
            code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

impl ProcessRunner for FakeProcess {
    fn run(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        Ok(self.record(program, args, env, cwd))
    }

    fn run_passthrough(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        Ok(self.record(program, args, env, cwd))
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        self.programs
            .lock()
            .unwrap()
            .contains(name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }
}

#[derive(Default)]
pub(crate) struct FakeDownloader {
    urls: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl FakeDownloader {
    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Every later download fails as if the network were down.
    pub(crate) fn go_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }
}

impl Downloader for FakeDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        if *self.offline.lock().unwrap() {
            bail!("failed to download {url}: connection refused");
        }
        fs::write(dest, b"7z archive")?;
        Ok(())
    }
}

/// Stands in for electron-builder: writes `{output}/{Name}-1.0.0.AppImage` files.
pub(crate) struct FakePackager {
    fail_install_for: Mutex<HashSet<String>>,
    fail_for: Mutex<HashSet<String>>,
    clobber_staging_root: Mutex<bool>,
    image_count: Mutex<usize>,
    packaged: Mutex<Vec<String>>,
}

impl Default for FakePackager {
    fn default() -> Self {
        Self {
            fail_install_for: Mutex::new(HashSet::new()),
            fail_for: Mutex::new(HashSet::new()),
            clobber_staging_root: Mutex::new(false),
            image_count: Mutex::new(1),
            packaged: Mutex::new(Vec::new()),
        }
    }
}

impl FakePackager {
    pub(crate) fn fail_install_for(&self, app_name: &str) {
        self.fail_install_for.lock().unwrap().insert(app_name.to_string());
    }

    pub(crate) fn fail_packaging_for(&self, app_name: &str) {
        self.fail_for.lock().unwrap().insert(app_name.to_string());
    }

    /// Makes `package` replace the staging root with a plain file, so removing the
    /// per-app staging directories afterwards fails.
    pub(crate) fn clobber_staging_root(&self) {
        *self.clobber_staging_root.lock().unwrap() = true;
    }

    pub(crate) fn set_image_count(&self, count: usize) {
        *self.image_count.lock().unwrap() = count;
    }

    pub(crate) fn packaged(&self) -> Vec<String> {
        self.packaged.lock().unwrap().clone()
    }
}

impl Packager for FakePackager {
    fn install_dependencies(&self, request: &PackageRequest<'_>) -> Result<()> {
        if self
            .fail_install_for
            .lock()
            .unwrap()
            .contains(&request.app.app_name)
        {
            bail!("npm install exited with status 1");
        }
        fs::create_dir_all(request.staging_dir.join("node_modules"))?;
        Ok(())
    }

    fn package(&self, request: &PackageRequest<'_>) -> Result<()> {
        let app = &request.app.app_name;
        self.packaged.lock().unwrap().push(app.clone());
        if *self.clobber_staging_root.lock().unwrap() {
            if let Some(root) = request.staging_dir.parent() {
                fs::remove_dir_all(root)?;
                fs::write(root, b"not a directory")?;
            }
        }
        if self.fail_for.lock().unwrap().contains(app) {
            bail!("electron-builder exited with status 1");
        }
        fs::create_dir_all(request.output_dir.join("linux-unpacked"))?;
        let count = *self.image_count.lock().unwrap();
        for index in 0..count {
            let suffix = if index == 0 {
                String::new()
            } else {
                format!("-{index}")
            };
            let image = request
                .output_dir
                .join(format!("{}-1.0.0{suffix}.AppImage", request.app.name));
            fs::write(image, elf_bytes())?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct FakeEffects {
    pub process: Arc<FakeProcess>,
    pub downloader: Arc<FakeDownloader>,
    pub bundler: Arc<ElectronBundleGenerator>,
    pub packager: Arc<FakePackager>,
}

impl FakeEffects {
    pub(crate) fn new() -> Self {
        Self {
            process: Arc::new(FakeProcess::default()),
            downloader: Arc::new(FakeDownloader::default()),
            bundler: Arc::new(ElectronBundleGenerator),
            packager: Arc::new(FakePackager::default()),
        }
    }

    pub(crate) fn with_program(self, name: &str) -> Self {
        self.process.add_program(name);
        self
    }
}

impl Effects for FakeEffects {
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

/// A sandboxed home directory with a valid toolchain cache and fake effects.
pub(crate) struct TestEnv {
    home: TempDir,
    config: Config,
    global: GlobalOptions,
    pub effects: FakeEffects,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let config = Config::from_paths(AppnixPaths::from_home(home.path()));
        seed_runtime(config.runtime());
        Self {
            home,
            config,
            global: GlobalOptions::default(),
            effects: FakeEffects::new(),
        }
    }

    pub(crate) fn home(&self) -> &Path {
        self.home.path()
    }

    pub(crate) fn paths(&self) -> &AppnixPaths {
        self.config.paths()
    }

    pub(crate) fn context(&self) -> CommandContext<'_> {
        CommandContext::with_config(
            &self.global,
            self.config.clone(),
            Arc::new(self.effects.clone()),
        )
    }
}

fn seed_runtime(runtime: &CachedRuntime) {
    fs::create_dir_all(runtime.cache_dir().join("linux-x64")).unwrap();
    fs::write(runtime.runtime_path(), elf_bytes()).unwrap();
    fs::write(runtime.mksquashfs_path(), b"#!/bin/sh\n").unwrap();
}
