//! Problem tag submission and drill-down

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rpt_common::db::{ProblemLineInput, ProblemTagHeader, ProblemTagInput, ProblemTagLine};
use serde::{Deserialize, Serialize};

use crate::api::params::ReportQuery;
use crate::error::ApiResult;
use crate::AppState;

/// Header plus its lines, submitted together
#[derive(Debug, Deserialize)]
pub struct SubmitProblemTag {
    pub header: ProblemTagInput,
    #[serde(default)]
    pub lines: Vec<ProblemLineInput>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
}

/// POST /api/problem-tags
pub async fn submit_problem_tag(
    State(state): State<AppState>,
    payload: Result<Json<SubmitProblemTag>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Created>)> {
    let Json(body) = payload?;
    let id = state
        .core
        .submit_problem_tag(&body.header, &body.lines)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /api/problem-tags
///
/// With `start`/`end`: headers in range matching the filters. Without: the
/// latest `limit` (default 500) headers matching the filters.
pub async fn list_problem_tags(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ProblemTagHeader>>> {
    let Query(query) = query?;

    let headers = if query.has_range() {
        state
            .core
            .fetch_headers(&query.range()?, &query.filter())
            .await?
    } else {
        state
            .core
            .queries()
            .fetch_recent(&query.filter(), query.limit)
            .await?
    };
    Ok(Json(headers))
}

/// GET /api/problem-tags/:id
pub async fn get_problem_tag(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ProblemTagHeader>> {
    let Path(id) = id?;
    Ok(Json(state.core.queries().fetch_header(id).await?))
}

/// GET /api/problem-tags/:id/lines
pub async fn get_problem_tag_lines(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<ProblemTagLine>>> {
    let Path(id) = id?;
    Ok(Json(state.core.fetch_lines(id).await?))
}

pub fn problem_tag_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/problem-tags",
            get(list_problem_tags).post(submit_problem_tag),
        )
        .route("/api/problem-tags/:id", get(get_problem_tag))
        .route("/api/problem-tags/:id/lines", get(get_problem_tag_lines))
}
