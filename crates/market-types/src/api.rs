//! API types for the marketplace HTTP API.
//!
//! Request bodies accepted by the order-form, checkout, logistics and chat
//! endpoints, plus the structured error type every endpoint returns.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/order-forms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOrderFormRequest {
	pub product_id: String,
	pub product_name: String,
	pub product_price: Decimal,
	#[serde(default)]
	pub product_image: Option<String>,
	#[serde(default)]
	pub product_description: Option<String>,
	pub quantity: u32,
	pub seller_id: String,
	pub buyer_id: String,
	#[serde(default)]
	pub thread_id: Option<String>,
}

/// Body of `POST /api/order-forms/{id}/accept` and `/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOrderFormRequest {
	pub buyer_id: String,
}

/// Body of `POST /api/order-forms/{id}/checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
	pub buyer_id: String,
	/// Buyer email forwarded to the payment provider.
	#[serde(default)]
	pub email: Option<String>,
	/// Overrides the configured default currency.
	#[serde(default)]
	pub currency: Option<String>,
	/// Reference returned by the payment widget's success callback.
	/// Absent when the widget was closed without paying.
	#[serde(default)]
	pub payment_reference: Option<String>,
}

/// Body of `POST /api/orders/{id}/logistics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectLogisticsRequest {
	pub buyer_id: String,
	pub logistics_company_id: String,
}

/// Body of `POST /api/threads/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
	pub sender_id: String,
	pub text: String,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed or invalid request (400)
	BadRequest { error_type: String, message: String },
	/// Caller is not the party allowed to act (403)
	Forbidden { error_type: String, message: String },
	/// Referenced record does not exist (404)
	NotFound { error_type: String, message: String },
	/// Record is not in a state that allows the action (409)
	Conflict { error_type: String, message: String },
	/// Business rule failure such as a declined payment (422)
	UnprocessableEntity { error_type: String, message: String },
	/// A downstream dependency is unavailable (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	fn parts(&self) -> (&str, &str) {
		match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
			}
			| APIError::ServiceUnavailable {
				error_type,
				message,
				..
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type.as_str(), message.as_str()),
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = self.parts();
		let retry_after = match self {
			APIError::ServiceUnavailable { retry_after, .. } => *retry_after,
			_ => None,
		};
		ErrorResponse {
			error: error_type.to_string(),
			message: message.to_string(),
			details: None,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (error_type, message) = self.parts();
		write!(f, "{} ({}): {}", error_type, self.status_code(), message)
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_response_mapping() {
		let err = APIError::Conflict {
			error_type: "INVALID_TRANSITION".into(),
			message: "form already rejected".into(),
		};
		assert_eq!(err.status_code(), 409);
		let body = err.to_error_response();
		assert_eq!(body.error, "INVALID_TRANSITION");
		assert!(body.retry_after.is_none());

		let err = APIError::ServiceUnavailable {
			error_type: "PAYMENT_UNAVAILABLE".into(),
			message: "gateway down".into(),
			retry_after: Some(30),
		};
		assert_eq!(err.to_error_response().retry_after, Some(30));
	}

	#[test]
	fn test_checkout_request_defaults() {
		let req: CheckoutRequest = serde_json::from_str(r#"{"buyerId":"b1"}"#).unwrap();
		assert_eq!(req.buyer_id, "b1");
		assert!(req.payment_reference.is_none());
		assert!(req.currency.is_none());
	}
}
