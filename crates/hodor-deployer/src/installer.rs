// installer.rs — Fetch, extract and swap one release into place.
//
// The install runs in three steps:
// 1. resolve the target directory for the release key (before any download)
// 2. fetch the archive and extract it into a fresh scratch directory
// 3. remove the old target and rename the extracted root directory onto it
//    (the scratch directory itself when the archive is rooted at `./`)
//
// The scratch directory is a TempDir and is removed on every exit path.
// Step 3 is two operations: a failure between the removal and the rename
// leaves the target absent. Only one install runs at a time (single
// worker), so target directories need no locking.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tempfile::TempDir;

use crate::archive;
use crate::config::ReleaseConfig;
use crate::error::InstallError;
use crate::fetch::Fetcher;

/// Installs release archives into their configured target directories.
pub struct Installer {
    config: ReleaseConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl Installer {
    pub fn new(config: ReleaseConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Install the archive at `source_url` for `release_key`.
    ///
    /// Returns the target directory that now holds the release.
    pub fn install(&self, release_key: &str, source_url: &Url) -> Result<PathBuf, InstallError> {
        let target = self
            .config
            .target_for(release_key)
            .ok_or_else(|| InstallError::UnknownRelease(release_key.to_string()))?
            .to_path_buf();

        let body = self
            .fetcher
            .fetch(source_url)
            .map_err(|source| InstallError::Fetch {
                url: source_url.to_string(),
                source,
            })?;

        let scratch = self.scratch_dir()?;
        tracing::info!(scratch = %scratch.path().display(), "using scratch directory");

        let root = archive::unpack_release(body, scratch.path())?;
        swap_into_place(&root, &target)?;

        Ok(target)
    }

    fn scratch_dir(&self) -> Result<TempDir, InstallError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hodor");

        match &self.config.scratch_dir {
            Some(root) => {
                fs::create_dir_all(root).map_err(|source| InstallError::IoError {
                    path: root.clone(),
                    source,
                })?;
                builder
                    .tempdir_in(root)
                    .map_err(|source| InstallError::IoError {
                        path: root.clone(),
                        source,
                    })
            }
            None => builder.tempdir().map_err(|source| InstallError::IoError {
                path: std::env::temp_dir(),
                source,
            }),
        }
    }
}

/// Replace whatever is at `target` with `staged`.
fn swap_into_place(staged: &Path, target: &Path) -> Result<(), InstallError> {
    remove_existing(target)?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| InstallError::IoError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::rename(staged, target).map_err(|source| InstallError::IoError {
        path: target.to_path_buf(),
        source,
    })
}

fn remove_existing(target: &Path) -> Result<(), InstallError> {
    let metadata = match fs::symlink_metadata(target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(InstallError::IoError {
                path: target.to_path_buf(),
                source,
            })
        }
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };
    removed.map_err(|source| InstallError::IoError {
        path: target.to_path_buf(),
        source,
    })
}
