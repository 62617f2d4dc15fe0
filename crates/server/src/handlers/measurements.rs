//! Measurement listing and raw measurement retrieval.

use super::common::{ListingQuery, join_url, next_page_url};
use crate::error::ApiResult;
use crate::extractor::RecordExtractor;
use crate::metrics::observe_listing_query;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::IntoResponse;
use msmt_core::{PageMetadata, ProbeAsn, TotalCount};
use msmt_metadata::repos::MeasurementRepo;
use msmt_metadata::{MeasurementFilter, MeasurementSortKey};
use serde::Serialize;
use std::time::Instant;
use time::OffsetDateTime;

pub const MEASUREMENTS_PATH: &str = "/api/v1/measurements";

/// Only confirmed measurements are listed unless the client asks otherwise.
const DEFAULT_CONFIRMED: &str = "true";

/// One measurement.
#[derive(Debug, Serialize)]
pub struct MeasurementEntry {
    pub measurement_url: String,
    pub measurement_id: String,
    pub report_id: String,
    pub probe_cc: String,
    pub probe_asn: String,
    pub test_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub measurement_start_time: OffsetDateTime,
    pub input: Option<String>,
    pub anomaly: bool,
    pub confirmed: bool,
    pub failure: bool,
}

/// Measurements listing response.
#[derive(Debug, Serialize)]
pub struct MeasurementsResponse {
    pub metadata: PageMetadata,
    pub results: Vec<MeasurementEntry>,
}

fn measurement_filter(
    params: &ListingQuery,
    report_index_offset: i64,
) -> ApiResult<MeasurementFilter> {
    Ok(MeasurementFilter {
        report_id: ListingQuery::text(&params.report_id),
        probe_cc: ListingQuery::text(&params.probe_cc),
        probe_asn: params.probe_asn()?,
        test_name: ListingQuery::text(&params.test_name),
        since: params.since()?,
        until: params.until()?,
        min_report_no: params.min_report_no(report_index_offset)?,
        input: ListingQuery::text(&params.input),
        anomaly: ListingQuery::tri_state("anomaly", &params.anomaly, None)?,
        confirmed: ListingQuery::tri_state(
            "confirmed",
            &params.confirmed,
            Some(DEFAULT_CONFIRMED),
        )?,
        failure: ListingQuery::tri_state("failure", &params.failure, None)?,
        order_by: ListingQuery::text(&params.order_by)
            .map(|s| MeasurementSortKey::parse(&s))
            .transpose()?,
        order: params.order()?,
    })
}

/// GET /api/v1/measurements
///
/// Never counts: a short page pins the total, a full page leaves it unknown
/// and always links to the next page.
pub async fn list_measurements(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<ListingQuery>,
) -> ApiResult<Json<MeasurementsResponse>> {
    let server = &state.config.server;
    let page = params.pagination(server)?;
    let filter = measurement_filter(&params, server.report_index_offset)?;

    let started = Instant::now();
    let rows = state.metadata.list_measurements(&filter, &page).await?;
    let query_time = started.elapsed().as_secs_f64();
    observe_listing_query("measurements", query_time);

    let count = TotalCount::from_page(&page, rows.len());
    let next_url = next_page_url(
        &server.base_url,
        MEASUREMENTS_PATH,
        raw_query.as_deref(),
        &page,
    )?;
    let metadata = PageMetadata::new(&page, count, || next_url).with_query_time(query_time);

    let results = rows
        .into_iter()
        .map(|row| {
            Ok(MeasurementEntry {
                measurement_url: join_url(
                    &server.base_url,
                    &format!("/api/v1/measurement/{}", row.measurement_id),
                )?
                .into(),
                measurement_id: row.measurement_id,
                report_id: row.report_id,
                probe_cc: row.probe_cc,
                probe_asn: ProbeAsn::new(row.probe_asn).to_string(),
                test_name: row.test_name,
                measurement_start_time: row.measurement_start_time,
                input: row.input,
                anomaly: row.anomaly,
                confirmed: row.confirmed,
                failure: row.failure,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(MeasurementsResponse { metadata, results }))
}

/// GET /api/v1/measurement/{measurement_id}
///
/// Responds with the raw record bytes exactly as archived.
pub async fn get_measurement(
    State(state): State<AppState>,
    Path(measurement_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let extractor = RecordExtractor::new(
        state.metadata.clone(),
        state.archive.clone(),
        state.config.archive.max_frame_size,
    );
    let record = extractor.extract(&measurement_id).await?;

    tracing::debug!(measurement_id = %measurement_id, bytes = record.len(), "Served measurement");

    Ok((
        [(header::CONTENT_TYPE, state.config.server.raw_content_type.clone())],
        record,
    ))
}
