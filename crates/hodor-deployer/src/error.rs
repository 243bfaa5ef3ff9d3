// error.rs — Error types for the deployment engine.

use std::path::PathBuf;

use hodor_store::StoreError;
use thiserror::Error;

/// Errors raised while loading the release configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid JSON.
    #[error("failed to decode {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The config file is not valid TOML.
    #[error("failed to decode {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A target directory is not an absolute path.
    #[error("target directory {path} for release {release:?} must be absolute")]
    RelativeTarget { release: String, path: PathBuf },
}

/// Errors raised by a [`Fetcher`](crate::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed or returned an error status.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The source is not available for another reason.
    #[error("{0}")]
    Unavailable(String),
}

/// The archive is not a release archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive has no entries at all.
    #[error("archive is empty")]
    Empty,

    /// The first entry is not a directory.
    #[error("archive must be a folder")]
    NotAFolder,

    /// An entry path is absolute or climbs out of the extraction directory.
    #[error("archive entry {path:?} escapes the extraction directory")]
    UnsafePath { path: String },

    /// The tar stream is malformed.
    #[error("failed to read archive: {0}")]
    Read(std::io::Error),
}

/// Errors that can occur while installing one release.
///
/// None of these are retried; the worker records them as a `failed` status.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The release key has no target directory in the config.
    #[error("releaseID {0:?} not found from the config")]
    UnknownRelease(String),

    /// Downloading the archive failed.
    #[error("failed to get file {url}: {source}")]
    Fetch { url: String, source: FetchError },

    /// The payload is not valid gzip.
    #[error("failed to decompress archive: {0}")]
    Decompress(std::io::Error),

    /// The payload is not a release archive.
    #[error(transparent)]
    Format(#[from] ArchiveError),

    /// A filesystem operation failed (create, write, remove, rename).
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors returned synchronously to callers of the engine.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The job queue is at capacity; the caller should retry later.
    #[error("buffer is full, re-try later")]
    QueueFull,

    /// The engine was stopped and accepts no more jobs.
    #[error("deployer is stopped")]
    Stopped,

    /// `start` was called while the worker is (or was) already running.
    #[error("deployer already started")]
    AlreadyStarted,

    /// The initial job status could not be persisted.
    #[error("failed to set job status: {0}")]
    Store(#[from] StoreError),
}
