//! Read-only analytics over problem tags and baseline volume

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use rpt_common::aggregation::{GroupMetrics, PackingSlipSummary, ShortHeavyCounts, TagMetrics};

use crate::api::params::ReportQuery;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/analytics/error-rates
///
/// Defaults: `group_by=customer`, `time_bucket=total`, `rank_by=error_rate`.
pub async fn error_rates(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<GroupMetrics>>> {
    let Query(query) = query?;
    let groups = state
        .core
        .aggregate(
            &query.range()?,
            &query.filter(),
            query.group_by.unwrap_or_default(),
            query.time_bucket.unwrap_or_default(),
            query.rank_by.unwrap_or_default(),
        )
        .await?;
    Ok(Json(groups))
}

/// GET /api/analytics/tags - per-tag rows behind the grouped rates
pub async fn tag_metrics(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TagMetrics>>> {
    let Query(query) = query?;
    let tags = state
        .core
        .aggregation()
        .tag_metrics(&query.range()?, &query.filter())
        .await?;
    Ok(Json(tags))
}

/// GET /api/analytics/short-heavy
pub async fn short_heavy_trend(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ShortHeavyCounts>>> {
    let Query(query) = query?;
    let trend = state
        .core
        .aggregation()
        .short_heavy_trend(
            &query.range()?,
            &query.filter(),
            query.time_bucket.unwrap_or_default(),
        )
        .await?;
    Ok(Json(trend))
}

/// GET /api/analytics/packing-slip
pub async fn packing_slip_summary(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<PackingSlipSummary>> {
    let Query(query) = query?;
    let summary = state
        .core
        .aggregation()
        .packing_slip_summary(&query.range()?, &query.filter())
        .await?;
    Ok(Json(summary))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/error-rates", get(error_rates))
        .route("/api/analytics/tags", get(tag_metrics))
        .route("/api/analytics/short-heavy", get(short_heavy_trend))
        .route("/api/analytics/packing-slip", get(packing_slip_summary))
}
