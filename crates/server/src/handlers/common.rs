//! Shared handler helpers: query parameter parsing and link synthesis.

use crate::error::{ApiError, ApiResult};
use msmt_core::config::ServerConfig;
use msmt_core::{Pagination, ProbeAsn, SortOrder, TriState, parse_timestamp, since_index_bound};
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;
use url::form_urlencoded;

/// Query parameters accepted by the listing endpoints.
///
/// Everything arrives as a string so that malformed values produce our own
/// error body instead of the extractor's rejection. The files listing
/// ignores the measurement-only parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub probe_asn: Option<String>,
    pub probe_cc: Option<String>,
    pub test_name: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub since_index: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
    // Measurements only
    pub report_id: Option<String>,
    pub input: Option<String>,
    pub failure: Option<String>,
    pub anomaly: Option<String>,
    pub confirmed: Option<String>,
}

impl ListingQuery {
    pub fn pagination(&self, server: &ServerConfig) -> ApiResult<Pagination> {
        let offset = parse_i64("offset", self.offset.as_deref())?;
        let limit = parse_i64("limit", self.limit.as_deref())?;
        Ok(Pagination::new(
            offset,
            limit,
            server.default_limit,
            server.max_limit,
        )?)
    }

    pub fn probe_asn(&self) -> ApiResult<Option<ProbeAsn>> {
        Ok(present(&self.probe_asn).map(ProbeAsn::parse).transpose()?)
    }

    pub fn since(&self) -> ApiResult<Option<OffsetDateTime>> {
        Ok(present(&self.since)
            .map(|s| parse_timestamp("since", s))
            .transpose()?)
    }

    pub fn until(&self) -> ApiResult<Option<OffsetDateTime>> {
        Ok(present(&self.until)
            .map(|s| parse_timestamp("until", s))
            .transpose()?)
    }

    /// Exclusive `report_no` lower bound derived from `since_index`.
    pub fn min_report_no(&self, report_index_offset: i64) -> ApiResult<Option<i64>> {
        Ok(parse_i64("since_index", self.since_index.as_deref())?
            .map(|idx| since_index_bound(idx, report_index_offset)))
    }

    pub fn order(&self) -> ApiResult<SortOrder> {
        match present(&self.order) {
            Some(order) => Ok(SortOrder::parse(order)?),
            None => Ok(SortOrder::Desc),
        }
    }

    /// Parse a tri-state filter, falling back to `default` when absent.
    pub fn tri_state(
        field: &'static str,
        raw: &Option<String>,
        default: Option<&str>,
    ) -> ApiResult<TriState> {
        Ok(TriState::from_param(field, present(raw).or(default))?)
    }

    pub fn text(value: &Option<String>) -> Option<String> {
        present(value).map(str::to_string)
    }
}

/// A parameter counts as given only when it is non-empty.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_i64(field: &'static str, raw: Option<&str>) -> ApiResult<Option<i64>> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("invalid {field}: {v}")))
        })
        .transpose()
}

/// Resolve `path` against the public base URL.
///
/// Absolute paths replace any path on the base, matching how relative links
/// resolve in a browser.
pub fn join_url(base_url: &str, path: &str) -> ApiResult<Url> {
    Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map_err(|e| ApiError::Internal(format!("cannot build link from {base_url}: {e}")))
}

/// Link to the page after `page`, keeping every other query parameter.
///
/// `offset` and `limit` keep their position when the client sent them and
/// are appended otherwise.
pub fn next_page_url(
    base_url: &str,
    path: &str,
    raw_query: Option<&str>,
    page: &Pagination,
) -> ApiResult<String> {
    let next_offset = page.next_offset().to_string();
    let limit = page.limit().to_string();

    let mut pairs: Vec<(String, String)> = raw_query
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let mut set = |key: &str, value: &str| {
        let mut seen = false;
        pairs.retain_mut(|(k, v)| {
            if k.as_str() != key {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = value.to_string();
            true
        });
        if !seen {
            pairs.push((key.to_string(), value.to_string()));
        }
    };
    set("offset", &next_offset);
    set("limit", &limit);

    let mut url = join_url(base_url, path)?;
    url.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(url.into())
}
