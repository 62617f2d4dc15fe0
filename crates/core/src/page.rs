//! Offset pagination and page metadata.
//!
//! Listing endpoints page with `offset` + `limit`. The report listing knows its
//! exact total from a COUNT query; the measurement listing never counts and
//! instead infers the total from whether the page came back full.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};

/// Validated offset/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    offset: i64,
    limit: i64,
}

impl Pagination {
    /// Validate raw query parameters.
    ///
    /// `offset` defaults to 0 and must not be negative. `limit` defaults to
    /// `default_limit` and must be in `1..=max_limit`.
    pub fn new(
        offset: Option<i64>,
        limit: Option<i64>,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<Self> {
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(Error::InvalidPagination(format!(
                "offset must be >= 0, got {offset}"
            )));
        }

        let limit = limit.unwrap_or(i64::from(default_limit));
        if limit <= 0 {
            return Err(Error::InvalidPagination(format!(
                "limit must be > 0, got {limit}"
            )));
        }
        if limit > i64::from(max_limit) {
            return Err(Error::InvalidPagination(format!(
                "limit must be <= {max_limit}, got {limit}"
            )));
        }

        Ok(Self { offset, limit })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// One-based page number: `ceil(offset / limit) + 1`.
    pub fn current_page(&self) -> i64 {
        div_ceil(self.offset, self.limit).saturating_add(1)
    }

    /// Number of pages needed for `count` rows: `ceil(count / limit)`.
    pub fn pages_for(&self, count: i64) -> i64 {
        div_ceil(count, self.limit)
    }

    /// Offset of the following page.
    pub fn next_offset(&self) -> i64 {
        self.offset.saturating_add(self.limit)
    }
}

/// Ceiling division for `n >= 0`, `d > 0` that cannot overflow.
fn div_ceil(n: i64, d: i64) -> i64 {
    if n <= 0 { 0 } else { n / d + i64::from(n % d != 0) }
}

/// Total number of rows matching a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCount {
    /// Exactly this many rows match.
    Exact(i64),
    /// At least this many rows match; the true total was not computed.
    AtLeast(i64),
}

impl TotalCount {
    /// Infer the total from a page of `returned` rows without counting.
    ///
    /// A short page is the last page, so the total is known exactly. A full
    /// page says nothing about what follows it.
    pub fn from_page(page: &Pagination, returned: usize) -> Self {
        let returned = i64::try_from(returned).unwrap_or(i64::MAX);
        if returned < page.limit() {
            Self::Exact(page.offset().saturating_add(returned))
        } else {
            Self::AtLeast(page.next_offset())
        }
    }

    pub fn exact(&self) -> Option<i64> {
        match self {
            Self::Exact(n) => Some(*n),
            Self::AtLeast(_) => None,
        }
    }

    /// Value reported to clients: the count, or -1 when unknown.
    pub fn wire_value(&self) -> i64 {
        self.exact().unwrap_or(-1)
    }
}

impl Serialize for TotalCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.wire_value())
    }
}

fn serialize_unknown_as_negative<S: Serializer>(
    value: &Option<i64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.unwrap_or(-1))
}

/// The `metadata` object of a listing response.
#[derive(Debug, Clone, Serialize)]
pub struct PageMetadata {
    pub offset: i64,
    pub limit: i64,
    pub count: TotalCount,
    #[serde(serialize_with = "serialize_unknown_as_negative")]
    pub pages: Option<i64>,
    pub current_page: i64,
    pub next_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<f64>,
}

impl PageMetadata {
    /// Build metadata for a page, given how the total is known.
    ///
    /// `next_url` is only invoked when another page may exist.
    pub fn new(page: &Pagination, count: TotalCount, next_url: impl FnOnce() -> String) -> Self {
        let pages = count.exact().map(|n| page.pages_for(n));
        let current_page = page.current_page();
        let has_next = match pages {
            Some(pages) => current_page < pages,
            None => true,
        };

        Self {
            offset: page.offset(),
            limit: page.limit(),
            count,
            pages,
            current_page,
            next_url: has_next.then(next_url),
            query_time: None,
        }
    }

    pub fn with_query_time(mut self, seconds: f64) -> Self {
        self.query_time = Some(seconds);
        self
    }

    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }
}
