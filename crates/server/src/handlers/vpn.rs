//! VPN configuration endpoint for probes.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::vpn::{OPENVPN_PROTOCOL, get_or_refresh};
use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

/// Credential material inside a [`VpnConfigResponse`].
#[derive(Debug, Serialize)]
pub struct OpenVpnConfig {
    pub ca: String,
    pub cert: String,
    pub key: String,
}

/// VPN configuration response.
#[derive(Debug, Serialize)]
pub struct VpnConfigResponse {
    pub provider: String,
    pub protocol: &'static str,
    pub config: OpenVpnConfig,
    pub date_updated: String,
}

/// `2024-03-01T10:20:30.123456Z`: microsecond precision, literal `Z`.
fn format_date_updated(ts: OffsetDateTime) -> ApiResult<String> {
    let utc = ts.to_offset(time::UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    ))
    .map_err(|e| ApiError::Internal(format!("cannot format date_updated: {e}")))
}

/// GET /api/v2/ooniprobe/vpn-config/{provider}
pub async fn get_vpn_config(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Json<VpnConfigResponse>> {
    if !state.config.vpn.serves(&provider) {
        return Err(ApiError::NotFound("provider not found".to_string()));
    }

    let row = get_or_refresh(
        state.metadata.as_ref(),
        state.vpn_source.as_ref(),
        &state.config.vpn,
        &provider,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok(Json(VpnConfigResponse {
        date_updated: format_date_updated(row.date_updated)?,
        provider: row.provider,
        protocol: OPENVPN_PROTOCOL,
        config: OpenVpnConfig {
            ca: row.openvpn_ca,
            cert: row.openvpn_cert,
            key: row.openvpn_key,
        },
    }))
}
