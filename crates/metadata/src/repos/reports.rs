//! Report file repository.

use crate::error::MetadataResult;
use crate::filter::FileFilter;
use crate::models::FileRow;
use async_trait::async_trait;
use msmt_core::Pagination;

/// Repository for report file listings.
#[async_trait]
pub trait ReportRepo: Send + Sync {
    /// One page of report files matching `filter`, in the filter's order.
    async fn list_files(&self, filter: &FileFilter, page: &Pagination)
    -> MetadataResult<Vec<FileRow>>;

    /// Number of report files matching `filter`, ignoring pagination.
    async fn count_files(&self, filter: &FileFilter) -> MetadataResult<i64>;
}
