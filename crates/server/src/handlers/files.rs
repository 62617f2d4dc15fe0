//! Report file listing.

use super::common::{ListingQuery, join_url, next_page_url};
use crate::error::ApiResult;
use crate::metrics::observe_listing_query;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, RawQuery, State};
use msmt_core::{PageMetadata, ProbeAsn, TotalCount};
use msmt_metadata::repos::ReportRepo;
use msmt_metadata::{FileFilter, FileSortKey};
use serde::Serialize;
use std::time::Instant;
use time::OffsetDateTime;

pub const FILES_PATH: &str = "/api/v1/files";

/// One report file.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub download_url: String,
    pub probe_cc: String,
    pub probe_asn: String,
    pub test_name: String,
    pub index: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub test_start_time: OffsetDateTime,
}

/// Files listing response.
#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub metadata: PageMetadata,
    pub results: Vec<FileEntry>,
}

/// GET /api/v1/files
pub async fn list_files(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListingQuery>,
) -> ApiResult<Json<FilesResponse>> {
    let server = &state.config.server;
    let page = params.pagination(server)?;

    let filter = FileFilter {
        probe_cc: ListingQuery::text(&params.probe_cc),
        probe_asn: params.probe_asn()?,
        test_name: ListingQuery::text(&params.test_name),
        since: params.since()?,
        until: params.until()?,
        min_report_no: params.min_report_no(server.report_index_offset)?,
        order_by: ListingQuery::text(&params.order_by)
            .map(|s| FileSortKey::parse(&s))
            .transpose()?
            .unwrap_or_default(),
        order: params.order()?,
    };

    let started = Instant::now();
    let count = state.metadata.count_files(&filter).await?;
    let rows = state.metadata.list_files(&filter, &page).await?;
    observe_listing_query("files", started.elapsed().as_secs_f64());

    let next_url = next_page_url(&server.base_url, FILES_PATH, raw_query.as_deref(), &page)?;
    let metadata = PageMetadata::new(&page, TotalCount::Exact(count), || next_url);

    let results = rows
        .into_iter()
        .map(|row| {
            Ok(FileEntry {
                download_url: join_url(
                    &server.base_url,
                    &format!("/files/download/{}", row.textname),
                )?
                .into(),
                probe_cc: row.probe_cc,
                probe_asn: ProbeAsn::new(row.probe_asn).to_string(),
                test_name: row.test_name,
                index: row.report_no + server.report_index_offset,
                test_start_time: row.test_start_time,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    tracing::debug!(
        count,
        returned = results.len(),
        offset = page.offset(),
        "Listed report files"
    );

    Ok(Json(FilesResponse { metadata, results }))
}
