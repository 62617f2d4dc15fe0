//! Typed listing filters.
//!
//! Handlers turn raw query parameters into these structs; the SQL layer only
//! ever sees validated values.

use msmt_core::{Error as CoreError, ProbeAsn, SortOrder, TriState};
use time::OffsetDateTime;

/// Sortable columns of the files listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileSortKey {
    #[default]
    Index,
    TestStartTime,
    ProbeCc,
    ProbeAsn,
    TestName,
}

impl FileSortKey {
    /// Resolve a public `order_by` value. `index` and `idx` both mean `report_no`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim() {
            "index" | "idx" | "report_no" => Ok(Self::Index),
            "test_start_time" => Ok(Self::TestStartTime),
            "probe_cc" => Ok(Self::ProbeCc),
            "probe_asn" => Ok(Self::ProbeAsn),
            "test_name" => Ok(Self::TestName),
            other => Err(CoreError::InvalidOrderBy(other.to_string())),
        }
    }

    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Index => "r.report_no",
            Self::TestStartTime => "r.test_start_time",
            Self::ProbeCc => "r.probe_cc",
            Self::ProbeAsn => "r.probe_asn",
            Self::TestName => "r.test_name",
        }
    }
}

/// Sortable columns of the measurements listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementSortKey {
    MeasurementStartTime,
    Index,
    MeasurementId,
    ReportId,
    ProbeCc,
    ProbeAsn,
    TestName,
    Input,
    Anomaly,
    Confirmed,
    Failure,
}

impl MeasurementSortKey {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim() {
            "measurement_start_time" => Ok(Self::MeasurementStartTime),
            "index" | "idx" | "report_no" => Ok(Self::Index),
            "measurement_id" => Ok(Self::MeasurementId),
            "report_id" => Ok(Self::ReportId),
            "probe_cc" => Ok(Self::ProbeCc),
            "probe_asn" => Ok(Self::ProbeAsn),
            "test_name" => Ok(Self::TestName),
            "input" => Ok(Self::Input),
            "anomaly" => Ok(Self::Anomaly),
            "confirmed" => Ok(Self::Confirmed),
            "failure" => Ok(Self::Failure),
            other => Err(CoreError::InvalidOrderBy(other.to_string())),
        }
    }
}

/// Conjunctive filter for the files listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub probe_cc: Option<String>,
    pub probe_asn: Option<ProbeAsn>,
    pub test_name: Option<String>,
    /// Exclusive lower bound on `test_start_time`.
    pub since: Option<OffsetDateTime>,
    /// Inclusive upper bound on `test_start_time`.
    pub until: Option<OffsetDateTime>,
    /// Exclusive lower bound on `report_no`, already shifted by the index offset.
    pub min_report_no: Option<i64>,
    pub order_by: FileSortKey,
    pub order: SortOrder,
}

/// Conjunctive filter for the measurements listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementFilter {
    pub report_id: Option<String>,
    pub probe_cc: Option<String>,
    pub probe_asn: Option<ProbeAsn>,
    pub test_name: Option<String>,
    /// Exclusive lower bound on `measurement_start_time`.
    pub since: Option<OffsetDateTime>,
    /// Inclusive upper bound on `measurement_start_time`.
    pub until: Option<OffsetDateTime>,
    pub min_report_no: Option<i64>,
    /// Substring match against the measurement input.
    pub input: Option<String>,
    pub anomaly: TriState,
    pub confirmed: TriState,
    pub failure: TriState,
    /// Rows come back in storage order when unset.
    pub order_by: Option<MeasurementSortKey>,
    pub order: SortOrder,
}

impl MeasurementFilter {
    /// Whether the inputs table has to be joined to answer this filter.
    pub fn joins_input(&self) -> bool {
        self.input.is_some()
    }
}
