//! Raw measurement extraction.
//!
//! A measurement is addressed by three levels of indirection: its row gives
//! the archive file (through its report), the compressed frame inside that
//! file, and the record inside the decompressed frame. Only the frame is
//! fetched; the archive file itself is never read whole.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    ARCHIVE_BYTES_FETCHED, ARCHIVE_FETCH_FAILURES, ARCHIVE_FETCHES, DUPLICATE_MEASUREMENT_ROWS,
    FRAME_DECODE_FAILURES,
};
use bytes::Bytes;
use msmt_archive::ArchiveStore;
use msmt_metadata::MetadataStore;
use msmt_metadata::models::MeasurementLocationRow;
use msmt_metadata::repos::MeasurementRepo;
use std::sync::Arc;

/// Resolves measurement ids to raw record bytes.
#[derive(Clone)]
pub struct RecordExtractor {
    metadata: Arc<dyn MetadataStore>,
    archive: Arc<dyn ArchiveStore>,
    max_frame_size: u64,
}

impl RecordExtractor {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        archive: Arc<dyn ArchiveStore>,
        max_frame_size: u64,
    ) -> Self {
        Self {
            metadata,
            archive,
            max_frame_size,
        }
    }

    /// Return the exact raw bytes stored for `measurement_id`.
    pub async fn extract(&self, measurement_id: &str) -> ApiResult<Bytes> {
        let location = self.locate(measurement_id).await?;
        let frame = self.fetch_frame(&location).await?;

        let (intra_off, intra_size) = (location.intra_off, location.intra_size);
        let decoded = tokio::task::spawn_blocking(move || {
            msmt_core::extract_record(&frame, intra_off, intra_size)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("decode task failed: {e}")))?;

        match decoded {
            Ok(record) => Ok(Bytes::from(record)),
            Err(e) => {
                FRAME_DECODE_FAILURES.inc();
                tracing::error!(
                    measurement_id,
                    filename = %location.filename,
                    frame_off = location.frame_off,
                    frame_size = location.frame_size,
                    intra_off,
                    intra_size,
                    error = %e,
                    "Stored coordinates do not match archive contents"
                );
                Err(ApiError::DataCorruption(e.to_string()))
            }
        }
    }

    /// Pick the archive location for `measurement_id`.
    ///
    /// Duplicated ids are a known data condition: the lowest `msm_no` wins.
    async fn locate(&self, measurement_id: &str) -> ApiResult<MeasurementLocationRow> {
        let mut rows = self
            .metadata
            .find_measurement_locations(measurement_id)
            .await?;

        if rows.len() > 1 {
            DUPLICATE_MEASUREMENT_ROWS.inc();
            tracing::warn!(
                measurement_id,
                rows = rows.len(),
                "Duplicate rows for measurement id, using the first"
            );
        }

        if rows.is_empty() {
            return Err(ApiError::NotFound(format!(
                "measurement not found: {measurement_id}"
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn fetch_frame(&self, location: &MeasurementLocationRow) -> ApiResult<Bytes> {
        let (start, last) = location.frame_range().ok_or_else(|| {
            ApiError::DataCorruption(format!(
                "invalid frame coordinates off={} size={} for {}",
                location.frame_off, location.frame_size, location.measurement_id
            ))
        })?;
        let size = last - start + 1;
        if size > self.max_frame_size {
            tracing::error!(
                measurement_id = %location.measurement_id,
                frame_size = size,
                max_frame_size = self.max_frame_size,
                "Frame exceeds configured maximum, refusing to fetch"
            );
            return Err(ApiError::DataCorruption(format!(
                "frame of {size} bytes exceeds maximum of {}",
                self.max_frame_size
            )));
        }

        let backend = self.archive.backend_name();
        ARCHIVE_FETCHES.with_label_values(&[backend]).inc();

        match self.archive.get_range(&location.filename, start, last + 1).await {
            Ok(frame) => {
                ARCHIVE_BYTES_FETCHED.inc_by(frame.len() as u64);
                Ok(frame)
            }
            Err(e) => {
                ARCHIVE_FETCH_FAILURES.with_label_values(&[backend]).inc();
                tracing::warn!(
                    filename = %location.filename,
                    start,
                    size,
                    error = %e,
                    "Archive range fetch failed"
                );
                Err(e.into())
            }
        }
    }
}
