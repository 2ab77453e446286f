//! Order form endpoints.
//!
//! - `POST /api/order-forms` issues a form (seller)
//! - `GET /api/order-forms?buyerId=&sellerId=` lists forms for a dashboard
//! - `GET /api/order-forms/{id}` fetches one form
//! - `POST /api/order-forms/{id}/accept` and `/reject` record the buyer's answer

use super::order_form_error;
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use market_types::{
	APIError, IssueOrderFormRequest, OrderForm, PartyFilter, RespondOrderFormRequest,
};

pub async fn issue_order_form(
	State(state): State<AppState>,
	Json(request): Json<IssueOrderFormRequest>,
) -> Result<(StatusCode, Json<OrderForm>), APIError> {
	let form = state
		.engine
		.issue_order_form(request)
		.await
		.map_err(order_form_error)?;
	Ok((StatusCode::CREATED, Json(form)))
}

pub async fn list_order_forms(
	State(state): State<AppState>,
	Query(filter): Query<PartyFilter>,
) -> Result<Json<Vec<OrderForm>>, APIError> {
	let forms = state
		.engine
		.list_order_forms(&filter)
		.await
		.map_err(order_form_error)?;
	Ok(Json(forms))
}

pub async fn get_order_form(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<OrderForm>, APIError> {
	let form = state
		.engine
		.get_order_form(&id)
		.await
		.map_err(order_form_error)?;
	Ok(Json(form))
}

pub async fn accept_order_form(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<RespondOrderFormRequest>,
) -> Result<Json<OrderForm>, APIError> {
	let form = state
		.engine
		.accept_order_form(&id, &request.buyer_id)
		.await
		.map_err(order_form_error)?;
	Ok(Json(form))
}

pub async fn reject_order_form(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<RespondOrderFormRequest>,
) -> Result<Json<OrderForm>, APIError> {
	let form = state
		.engine
		.reject_order_form(&id, &request.buyer_id)
		.await
		.map_err(order_form_error)?;
	Ok(Json(form))
}
