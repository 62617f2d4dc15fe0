//! Database row models.

use sqlx::FromRow;
use time::OffsetDateTime;

/// One report file as returned by the files listing.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileRow {
    pub report_no: i64,
    pub textname: String,
    pub test_start_time: OffsetDateTime,
    pub probe_cc: String,
    pub probe_asn: i64,
    pub test_name: String,
}

/// One measurement as returned by the measurements listing.
///
/// The boolean columns are already coalesced: label override first, then the
/// measurement's own value, then `false`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MeasurementRow {
    pub measurement_id: String,
    pub report_no: i64,
    pub report_id: String,
    pub probe_cc: String,
    pub probe_asn: i64,
    pub test_name: String,
    pub measurement_start_time: OffsetDateTime,
    pub input: Option<String>,
    pub anomaly: bool,
    pub confirmed: bool,
    pub failure: bool,
}

/// Where a measurement's raw record lives inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MeasurementLocationRow {
    pub msm_no: i64,
    pub measurement_id: String,
    pub report_no: i64,
    pub autoclaved_no: i64,
    pub filename: String,
    pub frame_off: i64,
    pub frame_size: i64,
    pub intra_off: i64,
    pub intra_size: i64,
}

impl MeasurementLocationRow {
    /// Inclusive byte range of the compressed frame, as used by HTTP `Range`.
    ///
    /// Returns `None` when the stored offsets cannot describe a valid range.
    pub fn frame_range(&self) -> Option<(u64, u64)> {
        let start = u64::try_from(self.frame_off).ok()?;
        let size = u64::try_from(self.frame_size).ok().filter(|s| *s > 0)?;
        let end = start.checked_add(size - 1)?;
        Some((start, end))
    }
}

/// Cached VPN credentials for one provider.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct VpnConfigRow {
    pub provider: String,
    pub protocol: String,
    pub openvpn_ca: String,
    pub openvpn_cert: String,
    pub openvpn_key: String,
    pub date_created: OffsetDateTime,
    pub date_updated: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(frame_off: i64, frame_size: i64) -> MeasurementLocationRow {
        MeasurementLocationRow {
            msm_no: 1,
            measurement_id: "temp-id-1".to_string(),
            report_no: 1,
            autoclaved_no: 1,
            filename: "2017-01-01/a.lz4".to_string(),
            frame_off,
            frame_size,
            intra_off: 0,
            intra_size: 1,
        }
    }

    #[test]
    fn test_frame_range_inclusive_end() {
        assert_eq!(location(0, 100).frame_range(), Some((0, 99)));
        assert_eq!(location(4096, 1).frame_range(), Some((4096, 4096)));
    }

    #[test]
    fn test_frame_range_rejects_bad_offsets() {
        assert_eq!(location(-1, 10).frame_range(), None);
        assert_eq!(location(0, 0).frame_range(), None);
        assert_eq!(location(0, -5).frame_range(), None);
    }
}
