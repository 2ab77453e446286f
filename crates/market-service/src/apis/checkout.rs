//! `POST /api/order-forms/{id}/checkout`: pays for an accepted form.
//!
//! Responds `201` with the created order. Cancelled or declined payments
//! respond `422`; an unreachable payment provider responds `503`.

use super::checkout_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{APIError, CheckoutRequest, Order};

pub async fn checkout(
	State(state): State<AppState>,
	Path(form_id): Path<String>,
	Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let order = state
		.engine
		.checkout(&form_id, request)
		.await
		.map_err(checkout_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}
