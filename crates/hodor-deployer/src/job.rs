// job.rs — A single deployment request.

use reqwest::Url;
use uuid::Uuid;

/// One request to install a release archive into one target directory.
///
/// Created by `deploy`, consumed exactly once by the worker, then dropped;
/// only its status outlives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Generated at submission, never reused.
    pub id: String,
    pub release_key: String,
    pub source_url: Url,
    /// Recorded as the release's latest tag if the install succeeds.
    pub tag: Option<String>,
}

impl Job {
    /// Build a job with a fresh id. An empty tag counts as no tag.
    pub fn new(release_key: impl Into<String>, source_url: Url, tag: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            release_key: release_key.into(),
            source_url,
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }
}
