// record.rs — The JobStatus record persisted for every job.

use serde::{Deserialize, Serialize};

/// Status of a job that was just accepted.
pub const STATUS_CREATED: &str = "created";
/// Status of a job whose release is installed.
pub const STATUS_OK: &str = "ok";
/// Status of a job whose install failed.
pub const STATUS_FAILED: &str = "failed";

/// Outcome of a deployment job as seen by pollers.
///
/// `status` is an open string; hodor itself only writes `created`, `ok` and
/// `failed`. `message` carries the human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl JobStatus {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Status written synchronously when a job is submitted.
    pub fn created() -> Self {
        Self::new(STATUS_CREATED, "job has been created")
    }

    /// Status written when the install succeeded.
    pub fn done() -> Self {
        Self::new(STATUS_OK, "job done")
    }

    /// Status written when the install failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(STATUS_FAILED, message)
    }

    /// Whether the worker has finished with the job.
    pub fn is_terminal(&self) -> bool {
        self.status != STATUS_CREATED
    }
}
