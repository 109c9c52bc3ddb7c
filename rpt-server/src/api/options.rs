//! Closed label sets for form dropdowns

use axum::{routing::get, Json, Router};
use rpt_common::db::{PackingSlipMatch, ProblemType, ShortHeavyTag, Size, Team};
use serde::Serialize;

use crate::AppState;

/// Every accepted label, in display order
#[derive(Debug, Serialize)]
pub struct FormOptions {
    pub teams: &'static [Team],
    pub problem_types: &'static [ProblemType],
    pub sizes: &'static [Size],
    pub short_heavy_tags: &'static [ShortHeavyTag],
    pub packing_slip_matches: &'static [PackingSlipMatch],
}

/// GET /api/options
pub async fn form_options() -> Json<FormOptions> {
    Json(FormOptions {
        teams: Team::ALL,
        problem_types: ProblemType::ALL,
        sizes: Size::ALL,
        short_heavy_tags: ShortHeavyTag::ALL,
        packing_slip_matches: PackingSlipMatch::ALL,
    })
}

pub fn option_routes() -> Router<AppState> {
    Router::new().route("/api/options", get(form_options))
}
