//! Chat thread endpoints.

use super::chat_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{APIError, ChatMessage, PostMessageRequest};

pub async fn thread_messages(
	State(state): State<AppState>,
	Path(thread_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, APIError> {
	let messages = state
		.engine
		.thread_messages(&thread_id)
		.await
		.map_err(chat_error)?;
	Ok(Json(messages))
}

pub async fn post_message(
	State(state): State<AppState>,
	Path(thread_id): Path<String>,
	Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), APIError> {
	let message = state
		.engine
		.post_message(&thread_id, &request.sender_id, &request.text)
		.await
		.map_err(chat_error)?;
	Ok((StatusCode::CREATED, Json(message)))
}
