//! Local filesystem archive backend.

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::{ArchiveStore, checked_range_len};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::instrument;

/// Archive files stored under a local directory.
pub struct FilesystemBackend {
    root: PathBuf,
    max_range_size: u64,
}

impl FilesystemBackend {
    /// Create a backend rooted at `root`, which must already exist.
    pub async fn new(root: impl AsRef<Path>, max_range_size: u64) -> ArchiveResult<Self> {
        let root = root.as_ref().to_path_buf();
        let meta = fs::metadata(&root).await.map_err(|e| {
            ArchiveError::Config(format!("archive root {}: {e}", root.display()))
        })?;
        if !meta.is_dir() {
            return Err(ArchiveError::Config(format!(
                "archive root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            max_range_size,
        })
    }

    /// Resolve `key` below the root, with path traversal protection.
    async fn key_path(&self, key: &str) -> ArchiveResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                ArchiveError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    fn key_path_sync(root: &Path, key: &str) -> ArchiveResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(ArchiveError::InvalidKey(format!("not a relative key: {key:?}")));
        }
        if !Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(ArchiveError::InvalidKey(format!(
                "contains unsafe path component: {key}"
            )));
        }

        let path = root.join(key);
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::NotFound(key.to_string()));
            }
            Err(e) => return Err(ArchiveError::Io(e)),
        };

        // Symlinks inside the root must not lead outside of it.
        if !canonical.starts_with(root.canonicalize()?) {
            return Err(ArchiveError::InvalidKey(format!(
                "resolved path escapes archive root: {key}"
            )));
        }
        Ok(canonical)
    }
}

#[async_trait]
impl ArchiveStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_range(&self, key: &str, start: u64, end: u64) -> ArchiveResult<Bytes> {
        let len = checked_range_len(start, end, self.max_range_size)?;
        let len = usize::try_from(len).map_err(|_| {
            ArchiveError::InvalidRange(format!(
                "range size {len} exceeds platform address space"
            ))
        })?;

        let path = self.key_path(key).await?;
        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::NotFound(key.to_string())
            } else {
                ArchiveError::Io(e)
            }
        })?;

        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut buf = Vec::with_capacity(len);
        (&mut file).take(len as u64).read_to_end(&mut buf).await?;

        if buf.len() < len {
            return Err(ArchiveError::ShortRead {
                key: key.to_string(),
                expected: len as u64,
                actual: buf.len() as u64,
            });
        }
        Ok(Bytes::from(buf))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> ArchiveResult<()> {
        fs::metadata(&self.root).await?;
        Ok(())
    }
}
