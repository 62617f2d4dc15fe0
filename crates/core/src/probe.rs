//! Autonomous system numbers as reported by probes.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A probe's autonomous system number.
///
/// Accepted on input as either `"AS1234"` or `"1234"`, stored as the bare
/// integer and always displayed as `"AS1234"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeAsn(i64);

impl ProbeAsn {
    /// Wrap a raw ASN as stored in the database.
    pub fn new(asn: i64) -> Self {
        Self(asn)
    }

    /// Parse an ASN from its query-string form.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("AS")
            .or_else(|| trimmed.strip_prefix("as"))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidProbeAsn(s.to_string()));
        }

        digits
            .parse::<i64>()
            .map(Self)
            .map_err(|_| Error::InvalidProbeAsn(s.to_string()))
    }

    /// The bare numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl FromStr for ProbeAsn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ProbeAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}
