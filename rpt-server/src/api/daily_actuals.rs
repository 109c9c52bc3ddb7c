//! Daily received-volume baseline

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rpt_common::baseline::NewDailyActual;
use rpt_common::db::DailyActual;

use crate::api::params::ReportQuery;
use crate::api::problem_tags::Created;
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/daily-actuals
pub async fn record_daily_actual(
    State(state): State<AppState>,
    payload: Result<Json<NewDailyActual>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(entry) = payload?;
    let id = state.core.baselines().record_entry(&entry).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /api/daily-actuals?start=&end=
pub async fn list_daily_actuals(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DailyActual>>> {
    let Query(query) = query?;
    let range = query.range()?;
    Ok(Json(
        state
            .core
            .baselines()
            .fetch_range(range.start, range.end)
            .await?,
    ))
}

pub fn daily_actual_routes() -> Router<AppState> {
    Router::new().route(
        "/api/daily-actuals",
        get(list_daily_actuals).post(record_daily_actual),
    )
}
