//! Customer and employee reference lists

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use rpt_common::db::NamedEntity;
use rpt_common::registry::RegistryKind;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub active: bool,
}

async fn list(state: &AppState, kind: RegistryKind) -> ApiResult<Json<Vec<NamedEntity>>> {
    Ok(Json(state.core.registry().list_active(kind).await?))
}

async fn create(
    state: &AppState,
    kind: RegistryKind,
    payload: Result<Json<CreateEntity>, JsonRejection>,
) -> ApiResult<Json<NamedEntity>> {
    let Json(body) = payload?;
    let id = state.core.registry().get_or_create(kind, &body.name).await?;
    Ok(Json(NamedEntity {
        id,
        name: body.name.trim().to_string(),
    }))
}

async fn set_active(
    state: &AppState,
    kind: RegistryKind,
    id: i64,
    payload: Result<Json<SetActive>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = payload?;
    state.core.registry().set_active(kind, id, body.active).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/customers
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<NamedEntity>>> {
    list(&state, RegistryKind::Customer).await
}

/// POST /api/customers - get-or-create by name
pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntity>, JsonRejection>,
) -> ApiResult<Json<NamedEntity>> {
    create(&state, RegistryKind::Customer, payload).await
}

/// PATCH /api/customers/:id
pub async fn set_customer_active(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SetActive>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    set_active(&state, RegistryKind::Customer, id, payload).await
}

/// GET /api/employees
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<Vec<NamedEntity>>> {
    list(&state, RegistryKind::Employee).await
}

/// POST /api/employees - get-or-create by name
pub async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntity>, JsonRejection>,
) -> ApiResult<Json<NamedEntity>> {
    create(&state, RegistryKind::Employee, payload).await
}

/// PATCH /api/employees/:id
pub async fn set_employee_active(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SetActive>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    set_active(&state, RegistryKind::Employee, id, payload).await
}

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/:id", patch(set_customer_active))
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/employees/:id", patch(set_employee_active))
}
