//! `GET /api/logistics`: the logistics catalog.

use crate::server::AppState;
use axum::{extract::State, Json};
use market_types::LogisticsCompany;

pub async fn list_companies(State(state): State<AppState>) -> Json<Vec<LogisticsCompany>> {
	Json(state.engine.logistics_companies().to_vec())
}
