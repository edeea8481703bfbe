use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::core::effects::{PackageRequest, Packager, ProcessRunner};

const CACHE_ENV: &str = "ELECTRON_BUILDER_CACHE";

/// Drives `npm` and `electron-builder` as external processes.
pub struct ElectronBuilderPackager {
    runner: Arc<dyn ProcessRunner>,
}

impl ElectronBuilderPackager {
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    fn run(&self, program: &str, args: &[String], request: &PackageRequest<'_>) -> Result<()> {
        let env = vec![(
            CACHE_ENV.to_string(),
            request.cache_root.display().to_string(),
        )];
        let output = self
            .runner
            .run_passthrough(program, args, &env, request.staging_dir)?;
        if !output.success() {
            bail!("{program} {} exited with status {}", args.join(" "), output.code);
        }
        Ok(())
    }
}

impl Packager for ElectronBuilderPackager {
    fn install_dependencies(&self, request: &PackageRequest<'_>) -> Result<()> {
        info!(app = %request.app.app_name, "installing dependencies");
        let args = vec!["install".to_string(), "--ignore-scripts".to_string()];
        self.run("npm", &args, request)
    }

    fn package(&self, request: &PackageRequest<'_>) -> Result<()> {
        info!(app = %request.app.app_name, "packaging AppImage");
        self.run("npx", &builder_args(request), request)
    }
}

fn builder_args(request: &PackageRequest<'_>) -> Vec<String> {
    let app = request.app;
    let mut args = vec![
        "--yes".to_string(),
        "electron-builder".to_string(),
        "--linux".to_string(),
        "AppImage".to_string(),
        "--projectDir".to_string(),
        request.staging_dir.display().to_string(),
        format!("-c.directories.output={}", request.output_dir.display()),
        format!("-c.appId=com.appnix.{}", app.app_name),
        format!("-c.productName={}", app.name),
        format!("-c.electronVersion={}", request.defaults.toolchain_version),
    ];
    let category = app.category_or_default();
    if !category.is_empty() {
        args.push(format!("-c.linux.category={category}"));
    }
    // electron-builder aborts on a missing icon, so only pass one that exists.
    if request.icon_path.is_file() {
        args.push(format!("-c.linux.icon={}", request.icon_path.display()));
    }
    args
}
