//! HTTP archive backend using byte-range requests.

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::{ArchiveStore, checked_range_len};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::StatusCode;
use reqwest::header::RANGE;
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Archive files served by a plain HTTP server that honours `Range`.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    max_range_size: u64,
}

impl HttpBackend {
    /// Create a backend rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration, max_range_size: u64) -> ArchiveResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ArchiveError::Config(format!("invalid archive base_url: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArchiveError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_range_size,
        })
    }

    fn object_url(&self, key: &str) -> ArchiveResult<Url> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(ArchiveError::InvalidKey("empty key".to_string()));
        }
        self.base_url
            .join(key)
            .map_err(|e| ArchiveError::InvalidKey(format!("{key}: {e}")))
    }
}

/// Read at most `limit` bytes of the response body, dropping the rest.
async fn read_prefix(mut response: reqwest::Response, limit: u64) -> ArchiveResult<Bytes> {
    let limit = usize::try_from(limit).map_err(|_| {
        ArchiveError::InvalidRange(format!("range size {limit} exceeds platform address space"))
    })?;
    let mut buf = BytesMut::with_capacity(limit);
    while let Some(chunk) = response.chunk().await? {
        let take = chunk.len().min(limit - buf.len());
        buf.extend_from_slice(&chunk[..take]);
        if buf.len() == limit {
            break;
        }
    }
    Ok(buf.freeze())
}

#[async_trait]
impl ArchiveStore for HttpBackend {
    #[instrument(skip(self), fields(backend = "http"))]
    async fn get_range(&self, key: &str, start: u64, end: u64) -> ArchiveResult<Bytes> {
        let len = checked_range_len(start, end, self.max_range_size)?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let url = self.object_url(key)?;
        // HTTP ranges are inclusive on both ends.
        let range = format!("bytes={}-{}", start, end - 1);
        let response = self.client.get(url).header(RANGE, range).send().await?;

        let status = response.status();
        let body = match status {
            StatusCode::PARTIAL_CONTENT => read_prefix(response, len).await?,
            // The server ignored the range. A prefix of the file is still
            // usable; anything else would mean downloading the whole file.
            StatusCode::OK if start == 0 => {
                tracing::debug!(key, "Range not honoured, reading file prefix");
                read_prefix(response, len).await?
            }
            StatusCode::NOT_FOUND => return Err(ArchiveError::NotFound(key.to_string())),
            _ => {
                return Err(ArchiveError::Status {
                    key: key.to_string(),
                    status: status.as_u16(),
                });
            }
        };

        let actual = body.len() as u64;
        if actual < len {
            return Err(ArchiveError::ShortRead {
                key: key.to_string(),
                expected: len,
                actual,
            });
        }
        Ok(body)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
