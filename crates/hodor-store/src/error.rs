// error.rs — Error types for the status store.

use std::path::PathBuf;

use thiserror::Error;

use crate::kv::Bucket;

/// Errors raised by a [`Codec`](crate::Codec).
#[derive(Debug, Error)]
pub enum CodecError {
    /// The JSON representation could not be produced or parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The codec refused the value.
    #[error("{0}")]
    Rejected(String),
}

/// Errors that can occur while reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No value is stored under the key.
    #[error("key {key:?} not found")]
    NotFound { bucket: Bucket, key: String },

    /// A value exists but could not be decoded.
    #[error("failed to decode value stored under {key:?}: {source}")]
    Decode { key: String, source: CodecError },

    /// A value could not be encoded before writing.
    #[error("failed to encode value for {key:?}: {source}")]
    Encode { key: String, source: CodecError },

    /// A stored tag is not UTF-8.
    #[error("tag stored for {key:?} is not valid UTF-8")]
    InvalidTag { key: String },

    /// The underlying database failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another thread panicked while holding the connection.
    #[error("store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when the error only means "nothing stored under this key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
