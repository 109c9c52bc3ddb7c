//! rpt-server library - HTTP surface over the problem-tag core
//!
//! Every route delegates to [`rpt_common::Core`]; handlers only translate
//! between JSON and core types.

use axum::Router;
use rpt_common::Core;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub core: Core,
}

impl AppState {
    pub fn new(core: Core) -> Self {
        Self { core }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::option_routes())
        .merge(api::reference_routes())
        .merge(api::problem_tag_routes())
        .merge(api::daily_actual_routes())
        .merge(api::analytics_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
