// status.rs — StatusStore: typed access to job statuses and latest tags.

use std::sync::Arc;

use crate::codec::{Codec, JsonCodec};
use crate::error::StoreError;
use crate::kv::{Bucket, KvStore};
use crate::record::JobStatus;

/// Job statuses (bucket `jobs`) and latest tags (bucket `tags`) over one KvStore.
pub struct StatusStore {
    kv: KvStore,
    codec: Arc<dyn Codec>,
}

impl StatusStore {
    /// Store statuses as JSON.
    pub fn new(kv: KvStore) -> Self {
        Self::with_codec(kv, Arc::new(JsonCodec))
    }

    pub fn with_codec(kv: KvStore, codec: Arc<dyn Codec>) -> Self {
        Self { kv, codec }
    }

    /// Persist the status of a job, replacing any earlier one.
    pub fn set_status(&self, job_id: &str, status: &JobStatus) -> Result<(), StoreError> {
        let raw = self
            .codec
            .encode(status)
            .map_err(|source| StoreError::Encode {
                key: job_id.to_string(),
                source,
            })?;
        self.kv.set(Bucket::Jobs, job_id, &raw)
    }

    /// Status of a job; `StoreError::NotFound` for an unknown id.
    pub fn get_status(&self, job_id: &str) -> Result<JobStatus, StoreError> {
        let raw = self.kv.get(Bucket::Jobs, job_id)?;
        self.codec
            .decode(&raw)
            .map_err(|source| StoreError::Decode {
                key: job_id.to_string(),
                source,
            })
    }

    /// Record `tag` as the latest one installed for `release_key`.
    pub fn set_tag(&self, release_key: &str, tag: &str) -> Result<(), StoreError> {
        self.kv.set(Bucket::Tags, release_key, tag.as_bytes())
    }

    /// Latest installed tag, or `None` if no tagged install succeeded yet.
    pub fn latest_tag(&self, release_key: &str) -> Result<Option<String>, StoreError> {
        match self.kv.get(Bucket::Tags, release_key) {
            Ok(raw) => String::from_utf8(raw)
                .map(Some)
                .map_err(|_| StoreError::InvalidTag {
                    key: release_key.to_string(),
                }),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
