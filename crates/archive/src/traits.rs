//! Archive store trait definition.

use crate::error::{ArchiveError, ArchiveResult};
use async_trait::async_trait;
use bytes::Bytes;

/// Read-only access to archive files by byte range.
#[async_trait]
pub trait ArchiveStore: Send + Sync + 'static {
    /// Read bytes `[start, end)` of the archive file `key`.
    ///
    /// Returns exactly `end - start` bytes or an error; a source that runs
    /// out of data early yields [`ArchiveError::ShortRead`].
    async fn get_range(&self, key: &str, start: u64, end: u64) -> ArchiveResult<Bytes>;

    /// Static identifier of the backend, used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable. Defaults to a no-op.
    async fn health_check(&self) -> ArchiveResult<()> {
        Ok(())
    }
}

/// Validate `[start, end)` against `max_len` and return its length.
pub(crate) fn checked_range_len(start: u64, end: u64, max_len: u64) -> ArchiveResult<u64> {
    if end < start {
        return Err(ArchiveError::InvalidRange(format!(
            "end ({end}) < start ({start})"
        )));
    }
    let len = end - start;
    if len > max_len {
        return Err(ArchiveError::InvalidRange(format!(
            "range size {len} exceeds maximum {max_len} bytes"
        )));
    }
    Ok(len)
}
