// codec.rs — Codec trait and its implementations.
//
// The store persists raw bytes; a Codec turns JobStatus records into those
// bytes and back. Production uses JsonCodec. FlakyCodec wraps JsonCodec and
// can be told to fail, so callers can exercise their error paths.

#[cfg(any(test, feature = "test-util"))]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::CodecError;
use crate::record::JobStatus;

/// Serialization seam for job status records.
pub trait Codec: Send + Sync {
    /// Encode a status into its stored representation.
    fn encode(&self, status: &JobStatus) -> Result<Vec<u8>, CodecError>;

    /// Decode a stored representation back into a status.
    fn decode(&self, raw: &[u8]) -> Result<JobStatus, CodecError>;
}

/// Stores statuses as `{"status": ..., "message": ...}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, status: &JobStatus) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(status)?)
    }

    fn decode(&self, raw: &[u8]) -> Result<JobStatus, CodecError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// JSON codec whose encode and decode can each be switched to fail.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct FlakyCodec {
    fail_encode: AtomicBool,
    fail_decode: AtomicBool,
}

#[cfg(any(test, feature = "test-util"))]
impl FlakyCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_encode(&self, fail: bool) {
        self.fail_encode.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_decode(&self, fail: bool) {
        self.fail_decode.store(fail, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Codec for FlakyCodec {
    fn encode(&self, status: &JobStatus) -> Result<Vec<u8>, CodecError> {
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(CodecError::Rejected("fake encode failure".to_string()));
        }
        JsonCodec.encode(status)
    }

    fn decode(&self, raw: &[u8]) -> Result<JobStatus, CodecError> {
        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(CodecError::Rejected("fake decode failure".to_string()));
        }
        JsonCodec.decode(raw)
    }
}
