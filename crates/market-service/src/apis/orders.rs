//! Order endpoints.

use super::{logistics_error, order_error};
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	Json,
};
use market_types::{APIError, Order, PartyFilter, SelectLogisticsRequest, ShipmentSummary};

pub async fn list_orders(
	State(state): State<AppState>,
	Query(filter): Query<PartyFilter>,
) -> Result<Json<Vec<Order>>, APIError> {
	let orders = state
		.engine
		.list_orders(&filter)
		.await
		.map_err(order_error)?;
	Ok(Json(orders))
}

pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	let order = state.engine.get_order(&id).await.map_err(order_error)?;
	Ok(Json(order))
}

/// Chooses a logistics company for a paid order and returns the shipment
/// summary with the grand total.
pub async fn select_logistics(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<SelectLogisticsRequest>,
) -> Result<Json<ShipmentSummary>, APIError> {
	let summary = state
		.engine
		.select_logistics(&id, &request.buyer_id, &request.logistics_company_id)
		.await
		.map_err(logistics_error)?;
	Ok(Json(summary))
}
