//! # hodor-store
//!
//! Persisted job status and release tag store for hodor.
//!
//! Every deployment job records its status here: once when it is created and
//! once more when the worker finishes it. Successful tagged installs also
//! record the tag as the latest one for their release key.
//!
//! ## Key components
//!
//! - [`KvStore`] — SQLite-backed key-value store, one transaction per call,
//!   with keys split into [`Bucket`] namespaces
//! - [`Codec`] — serialization seam for [`JobStatus`] values ([`JsonCodec`]
//!   in production)
//! - [`StatusStore`] — typed access to job statuses and latest tags

pub mod codec;
pub mod error;
pub mod kv;
pub mod record;
pub mod status;

pub use codec::{Codec, JsonCodec};
#[cfg(any(test, feature = "test-util"))]
pub use codec::FlakyCodec;
pub use error::{CodecError, StoreError};
pub use kv::{Bucket, KvStore};
pub use record::JobStatus;
pub use status::StatusStore;
