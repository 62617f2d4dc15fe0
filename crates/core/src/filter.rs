//! Listing filter primitives shared by the query endpoints.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Sort direction for listing queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse `asc` / `desc`, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(Error::InvalidOrder(s.to_string())),
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// A boolean filter that may also mean "don't care".
///
/// Query parameters carry a comma-separated list of `true` / `false`.
/// Listing both values is the same as not filtering at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriState {
    #[default]
    Any,
    Only(bool),
}

impl TriState {
    /// Parse a comma-separated list such as `"true"`, `"false"` or `"true, false"`.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self> {
        let mut seen_true = false;
        let mut seen_false = false;

        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.to_ascii_lowercase().as_str() {
                "true" => seen_true = true,
                "false" => seen_false = true,
                _ => {
                    return Err(Error::InvalidBooleanFilter {
                        field,
                        value: raw.to_string(),
                    });
                }
            }
        }

        Ok(match (seen_true, seen_false) {
            (true, false) => Self::Only(true),
            (false, true) => Self::Only(false),
            _ => Self::Any,
        })
    }

    /// Parse an optional query parameter, treating absence as `Any`.
    pub fn from_param(field: &'static str, raw: Option<&str>) -> Result<Self> {
        raw.map_or(Ok(Self::Any), |raw| Self::parse(field, raw))
    }

    /// The pinned value, if any.
    pub fn value(&self) -> Option<bool> {
        match self {
            Self::Any => None,
            Self::Only(v) => Some(*v),
        }
    }
}

/// Convert a public `since_index` cursor into a `report_no` lower bound.
pub fn since_index_bound(since_index: i64, report_index_offset: i64) -> i64 {
    since_index.saturating_sub(report_index_offset).max(0)
}

/// Parse a user-supplied timestamp filter.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (also with a space
/// separator) and bare `YYYY-MM-DD`. Naive values are taken as UTC, and
/// offset values are normalized to UTC.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<OffsetDateTime> {
    let s = raw.trim();

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];
    for format in naive_formats {
        if let Ok(dt) = PrimitiveDateTime::parse(s, format) {
            return Ok(dt.assume_utc());
        }
    }

    if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_utc());
    }

    Err(Error::InvalidTimestamp {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("asc").unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::parse("DESC").unwrap(), SortOrder::Desc);
        assert!(matches!(
            SortOrder::parse("sideways"),
            Err(Error::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_tristate_both_values_is_any() {
        assert_eq!(TriState::parse("failure", "true,false").unwrap(), TriState::Any);
        assert_eq!(
            TriState::parse("failure", " false , true ").unwrap(),
            TriState::Any
        );
    }

    #[test]
    fn test_tristate_single_values() {
        assert_eq!(
            TriState::parse("anomaly", "true").unwrap(),
            TriState::Only(true)
        );
        assert_eq!(
            TriState::parse("anomaly", "false,false").unwrap(),
            TriState::Only(false)
        );
        assert_eq!(TriState::from_param("anomaly", None).unwrap(), TriState::Any);
    }

    #[test]
    fn test_tristate_rejects_unknown_token() {
        let err = TriState::parse("confirmed", "true,maybe").unwrap_err();
        assert!(err.to_string().contains("confirmed"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("since", "2017-04-01T12:30:00Z").unwrap(),
            datetime!(2017-04-01 12:30:00 UTC)
        );
        let shifted = parse_timestamp("since", "2017-04-01T14:30:00+02:00").unwrap();
        assert_eq!(shifted, datetime!(2017-04-01 12:30:00 UTC));
        assert_eq!(shifted.offset(), UtcOffset::UTC);
        assert_eq!(
            parse_timestamp("since", "2017-04-01T12:30:00").unwrap(),
            datetime!(2017-04-01 12:30:00 UTC)
        );
        assert_eq!(
            parse_timestamp("since", "2017-04-01 12:30:00.5").unwrap(),
            datetime!(2017-04-01 12:30:00.5 UTC)
        );
        assert_eq!(
            parse_timestamp("until", "2017-04-01").unwrap(),
            datetime!(2017-04-01 0:00 UTC)
        );
    }

    #[test]
    fn test_since_index_bound() {
        assert_eq!(since_index_bound(3_000_123, 3_000_000), 123);
        assert_eq!(since_index_bound(10, 3_000_000), 0);
        assert_eq!(since_index_bound(42, 0), 42);
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        match parse_timestamp("until", "last tuesday") {
            Err(Error::InvalidTimestamp { field, value }) => {
                assert_eq!(field, "until");
                assert_eq!(value, "last tuesday");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
