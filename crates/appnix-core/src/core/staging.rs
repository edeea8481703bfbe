use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::config::AppnixPaths;
use crate::core::fs::{ensure_dir, remove_dir_if_exists};
use crate::core::tooling::errors::AppnixError;

const ARTIFACT_SUFFIX: &str = ".AppImage";

/// Working directories for one app's build.
///
/// Both directories are removed by [`StagingSession::release`]; if a session is dropped
/// without being released (early return or unwind) the same cleanup runs from `Drop`.
#[derive(Debug)]
pub struct StagingSession {
    app_id: String,
    staging_dir: PathBuf,
    output_dir: PathBuf,
    released: bool,
}

impl StagingSession {
    /// Creates (or reuses) the staging directory for `app_id`, starts a fresh output
    /// directory, and makes sure the bin and icons directories exist.
    ///
    /// The output directory is emptied first so an artifact left by an interrupted run
    /// is never picked up.
    ///
    /// # Errors
    ///
    /// Returns an error when any directory cannot be created or the stale output cannot
    /// be removed. Directories created before the failure are removed.
    pub fn acquire(paths: &AppnixPaths, app_id: &str) -> Result<Self> {
        let session = Self {
            app_id: app_id.to_string(),
            staging_dir: paths.staging_dir(app_id),
            output_dir: paths.output_dir(app_id),
            released: false,
        };
        ensure_dir(&session.staging_dir)?;
        remove_dir_if_exists(&session.output_dir)?;
        ensure_dir(&session.output_dir)?;
        ensure_dir(&paths.bin_dir)?;
        ensure_dir(&paths.icons_dir)?;
        debug!(app = app_id, dir = %session.staging_dir.display(), "staging acquired");
        Ok(session)
    }

    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Finds the single `.AppImage` the packager wrote under the output directory.
    ///
    /// # Errors
    ///
    /// [`AppnixError::ArtifactNotFound`] when nothing matches,
    /// [`AppnixError::ArtifactAmbiguous`] when more than one file does.
    pub fn locate_artifact(&self) -> Result<PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![self.output_dir.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir)
                .with_context(|| format!("reading {}", dir.display()))?
                .collect::<std::io::Result<Vec<_>>>()
                .with_context(|| format!("reading {}", dir.display()))?;
            entries.sort_by_key(fs::DirEntry::file_name);
            // Reverse so the stack visits children in name order.
            for entry in entries.into_iter().rev() {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .with_context(|| format!("inspecting {}", path.display()))?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with(ARTIFACT_SUFFIX))
                {
                    found.push(path);
                }
            }
        }
        match found.len() {
            0 => Err(AppnixError::ArtifactNotFound {
                app: self.app_id.clone(),
                dir: self.output_dir.clone(),
            }
            .into()),
            1 => Ok(found.remove(0)),
            _ => Err(AppnixError::ArtifactAmbiguous {
                app: self.app_id.clone(),
                found,
            }
            .into()),
        }
    }

    /// Removes both staging directories. Failures are logged, never returned.
    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for dir in [&self.staging_dir, &self.output_dir] {
            if let Err(err) = remove_dir_if_exists(dir) {
                warn!(app = %self.app_id, error = %format!("{err:#}"), "failed to remove staging directory");
            }
        }
        debug!(app = %self.app_id, "staging released");
    }
}

impl Drop for StagingSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(root: &Path) -> Result<(AppnixPaths, StagingSession)> {
        let paths = AppnixPaths::from_home(root);
        let session = StagingSession::acquire(&paths, "wiki")?;
        Ok((paths, session))
    }

    #[test]
    fn acquire_creates_every_directory() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (paths, session) = session(home.path())?;
        assert!(session.staging_dir().is_dir());
        assert!(session.output_dir().is_dir());
        assert!(paths.bin_dir.is_dir());
        assert!(paths.icons_dir.is_dir());
        Ok(())
    }

    #[test]
    fn acquire_discards_stale_output_but_keeps_staging() -> Result<()> {
        let home = tempfile::tempdir()?;
        let paths = AppnixPaths::from_home(home.path());
        fs::create_dir_all(paths.output_dir("wiki"))?;
        fs::create_dir_all(paths.staging_dir("wiki").join("node_modules"))?;
        fs::write(paths.output_dir("wiki").join("OldName-1.0.0.AppImage"), b"old")?;

        let session = StagingSession::acquire(&paths, "wiki")?;
        assert!(session.staging_dir().join("node_modules").is_dir());
        fs::write(session.output_dir().join("Wiki-1.0.0.AppImage"), b"new")?;
        let artifact = session.locate_artifact()?;
        assert_eq!(artifact, session.output_dir().join("Wiki-1.0.0.AppImage"));
        Ok(())
    }

    #[test]
    fn release_and_drop_both_remove_staging() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (paths, session) = session(home.path())?;
        fs::write(session.staging_dir().join("package.json"), "{}")?;
        session.release();
        assert!(!paths.staging_dir("wiki").exists());
        assert!(!paths.output_dir("wiki").exists());

        {
            let _session = StagingSession::acquire(&paths, "wiki")?;
        }
        assert!(!paths.staging_dir("wiki").exists());
        assert!(!paths.output_dir("wiki").exists());
        Ok(())
    }

    #[test]
    fn release_tolerates_missing_directories() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (paths, session) = session(home.path())?;
        fs::remove_dir_all(paths.staging_dir("wiki"))?;
        session.release();
        assert!(!paths.output_dir("wiki").exists());
        Ok(())
    }

    #[test]
    fn release_swallows_removal_failures() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (paths, session) = session(home.path())?;
        fs::remove_dir_all(&paths.staging_root)?;
        fs::write(&paths.staging_root, b"not a directory")?;
        session.release();
        assert!(paths.staging_root.is_file());
        Ok(())
    }

    #[test]
    fn locates_a_nested_artifact() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (_paths, session) = session(home.path())?;
        let nested = session.output_dir().join("dist");
        fs::create_dir_all(nested.join("linux-unpacked"))?;
        fs::write(nested.join("linux-unpacked").join("wiki"), b"bin")?;
        fs::write(nested.join("Wiki-1.0.0.AppImage"), b"img")?;
        let artifact = session.locate_artifact()?;
        assert_eq!(artifact, nested.join("Wiki-1.0.0.AppImage"));
        Ok(())
    }

    #[test]
    fn zero_or_many_artifacts_are_errors() -> Result<()> {
        let home = tempfile::tempdir()?;
        let (_paths, session) = session(home.path())?;
        let err = session.locate_artifact().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppnixError>(),
            Some(AppnixError::ArtifactNotFound { .. })
        ));

        fs::write(session.output_dir().join("a.AppImage"), b"1")?;
        fs::write(session.output_dir().join("b.AppImage"), b"2")?;
        let err = session.locate_artifact().unwrap_err();
        match err.downcast_ref::<AppnixError>() {
            Some(AppnixError::ArtifactAmbiguous { found, .. }) => assert_eq!(found.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }
}
