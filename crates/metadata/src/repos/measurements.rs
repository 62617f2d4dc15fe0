//! Measurement repository.

use crate::error::MetadataResult;
use crate::filter::MeasurementFilter;
use crate::models::{MeasurementLocationRow, MeasurementRow};
use async_trait::async_trait;
use msmt_core::Pagination;

/// Repository for measurement listings and archive lookups.
#[async_trait]
pub trait MeasurementRepo: Send + Sync {
    /// One page of measurements matching `filter`. There is deliberately no
    /// count counterpart.
    async fn list_measurements(
        &self,
        filter: &MeasurementFilter,
        page: &Pagination,
    ) -> MetadataResult<Vec<MeasurementRow>>;

    /// Every archive location stored for `measurement_id`, ordered by `msm_no`.
    ///
    /// More than one row means the identifier is duplicated in the database.
    async fn find_measurement_locations(
        &self,
        measurement_id: &str,
    ) -> MetadataResult<Vec<MeasurementLocationRow>>;
}
