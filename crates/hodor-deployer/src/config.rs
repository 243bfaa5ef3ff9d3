// config.rs — Release configuration.
//
// Maps each release key to the directory its archive is installed into.
// Loaded once before the engine starts and never reloaded. The file is
// JSON (`{"entries": {"svc": "/srv/svc"}}`) unless its extension is
// `.toml`, in which case the same shape is read as TOML:
//
//   scratch_dir = "/srv/.hodor"
//
//   [entries]
//   svc = "/srv/svc"

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Release key → target directory mapping, plus install options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Absolute target directory per release key.
    #[serde(default)]
    pub entries: BTreeMap<String, PathBuf>,

    /// Where scratch directories are created (system temp dir when unset).
    /// Keep it on the same volume as the targets so the final swap is a
    /// plain rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl ReleaseConfig {
    /// Load a config file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Add a mapping.
    pub fn with_entry(mut self, release_key: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        self.entries.insert(release_key.into(), target.into());
        self
    }

    /// Reject target directories that are not absolute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (release, path) in &self.entries {
            if !path.is_absolute() {
                return Err(ConfigError::RelativeTarget {
                    release: release.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Target directory for a release key.
    pub fn target_for(&self, release_key: &str) -> Option<&Path> {
        self.entries.get(release_key).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"entries": {"svc": "/srv/svc"}}"#).unwrap();

        let config = ReleaseConfig::load(&path).unwrap();
        assert_eq!(config.target_for("svc"), Some(Path::new("/srv/svc")));
        assert_eq!(config.scratch_dir, None);
    }

    #[test]
    fn load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hodor.toml");
        fs::write(
            &path,
            "scratch_dir = \"/srv/.hodor\"\n\n[entries]\nsvc = \"/srv/svc\"\n",
        )
        .unwrap();

        let config = ReleaseConfig::load(&path).unwrap();
        assert_eq!(config.target_for("svc"), Some(Path::new("/srv/svc")));
        assert_eq!(config.scratch_dir, Some(PathBuf::from("/srv/.hodor")));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = ReleaseConfig::load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn load_malformed_json_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"entries\": ").unwrap();
        assert!(matches!(
            ReleaseConfig::load(&path),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn validate_rejects_relative_targets() {
        let config = ReleaseConfig::default().with_entry("svc", "relative/dir");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::RelativeTarget { ref release, .. } if release == "svc"));
    }

    #[test]
    fn unknown_release_has_no_target() {
        let config = ReleaseConfig::default().with_entry("svc", "/srv/svc");
        assert!(config.validate().is_ok());
        assert_eq!(config.target_for("other"), None);
    }
}
