//! HTTP handlers, one module per resource.
//!
//! Engine errors are mapped to [`APIError`] here so each endpoint reports a
//! stable error code and the matching status.

pub mod checkout;
pub mod logistics;
pub mod order_forms;
pub mod orders;
pub mod threads;

use market_core::{ChatError, CheckoutError, LogisticsError, OrderFormError, OrderStateError};
use market_types::APIError;

/// Seconds a client should wait before retrying when the payment provider is down.
const PAYMENT_RETRY_AFTER_SECS: u64 = 30;

fn bad_request(error_type: &str, message: impl ToString) -> APIError {
	APIError::BadRequest {
		error_type: error_type.to_string(),
		message: message.to_string(),
	}
}

fn forbidden(message: impl ToString) -> APIError {
	APIError::Forbidden {
		error_type: "FORBIDDEN".to_string(),
		message: message.to_string(),
	}
}

fn not_found(error_type: &str, message: impl ToString) -> APIError {
	APIError::NotFound {
		error_type: error_type.to_string(),
		message: message.to_string(),
	}
}

fn conflict(error_type: &str, message: impl ToString) -> APIError {
	APIError::Conflict {
		error_type: error_type.to_string(),
		message: message.to_string(),
	}
}

fn internal(message: impl ToString) -> APIError {
	APIError::InternalServerError {
		error_type: "STORAGE_ERROR".to_string(),
		message: message.to_string(),
	}
}

pub(crate) fn order_form_error(e: OrderFormError) -> APIError {
	tracing::warn!("Order form request failed: {}", e);
	match e {
		OrderFormError::Invalid(_) => bad_request("INVALID_ORDER_FORM", &e),
		OrderFormError::NotFound(_) => not_found("ORDER_FORM_NOT_FOUND", &e),
		OrderFormError::Forbidden(_) => forbidden(&e),
		OrderFormError::InvalidTransition { .. } => conflict("INVALID_TRANSITION", &e),
		OrderFormError::Storage(_) => internal(&e),
	}
}

pub(crate) fn checkout_error(e: CheckoutError) -> APIError {
	tracing::warn!("Checkout failed: {}", e);
	match e {
		CheckoutError::NotFound(_) => not_found("ORDER_FORM_NOT_FOUND", &e),
		CheckoutError::Forbidden(_) => forbidden(&e),
		CheckoutError::NotAccepted(_) => conflict("ORDER_FORM_NOT_ACCEPTED", &e),
		CheckoutError::TotalMismatch { .. } => conflict("TOTAL_MISMATCH", &e),
		CheckoutError::AlreadyCheckedOut(_) => conflict("ALREADY_CHECKED_OUT", &e),
		CheckoutError::InProgress(_) => conflict("CHECKOUT_IN_PROGRESS", &e),
		CheckoutError::ReferenceReused(_) => conflict("PAYMENT_REFERENCE_REUSED", &e),
		CheckoutError::Invalid(_) => bad_request("INVALID_CHECKOUT", &e),
		CheckoutError::PaymentCancelled => APIError::UnprocessableEntity {
			error_type: "PAYMENT_CANCELLED".to_string(),
			message: e.to_string(),
		},
		CheckoutError::Payment(_) => APIError::UnprocessableEntity {
			error_type: "PAYMENT_FAILED".to_string(),
			message: e.to_string(),
		},
		CheckoutError::PaymentUnavailable(_) => APIError::ServiceUnavailable {
			error_type: "PAYMENT_UNAVAILABLE".to_string(),
			message: e.to_string(),
			retry_after: Some(PAYMENT_RETRY_AFTER_SECS),
		},
		CheckoutError::Storage(_) => internal(&e),
	}
}

pub(crate) fn logistics_error(e: LogisticsError) -> APIError {
	tracing::warn!("Logistics selection failed: {}", e);
	match e {
		LogisticsError::OrderNotFound(_) => not_found("ORDER_NOT_FOUND", &e),
		LogisticsError::UnknownCompany(_) => bad_request("UNKNOWN_LOGISTICS_COMPANY", &e),
		LogisticsError::Forbidden(_) => forbidden(&e),
		LogisticsError::PaymentIncomplete(_) => conflict("PAYMENT_INCOMPLETE", &e),
		LogisticsError::InvalidTransition { .. } => conflict("INVALID_TRANSITION", &e),
		LogisticsError::Invalid(_) => bad_request("INVALID_LOGISTICS_SELECTION", &e),
		LogisticsError::Storage(_) => internal(&e),
	}
}

pub(crate) fn order_error(e: OrderStateError) -> APIError {
	match e {
		OrderStateError::OrderNotFound(_) => not_found("ORDER_NOT_FOUND", &e),
		other => {
			tracing::warn!("Order request failed: {}", other);
			internal(&other)
		},
	}
}

pub(crate) fn chat_error(e: ChatError) -> APIError {
	tracing::warn!("Chat request failed: {}", e);
	match e {
		ChatError::Invalid(_) => bad_request("INVALID_MESSAGE", &e),
		ChatError::Storage(_) => internal(&e),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::OrderFormStatus;

	#[test]
	fn test_checkout_error_status_codes() {
		assert_eq!(checkout_error(CheckoutError::NotFound("f".into())).status_code(), 404);
		assert_eq!(
			checkout_error(CheckoutError::NotAccepted(OrderFormStatus::Pending)).status_code(),
			409
		);
		assert_eq!(checkout_error(CheckoutError::PaymentCancelled).status_code(), 422);
		assert_eq!(
			checkout_error(CheckoutError::ReferenceReused("T123".into())).status_code(),
			409
		);

		let unavailable = checkout_error(CheckoutError::PaymentUnavailable("down".into()));
		assert_eq!(unavailable.status_code(), 503);
		assert_eq!(
			unavailable.to_error_response().retry_after,
			Some(PAYMENT_RETRY_AFTER_SECS)
		);
	}

	#[test]
	fn test_transition_errors_are_conflicts() {
		let err = order_form_error(OrderFormError::InvalidTransition {
			from: OrderFormStatus::Rejected,
			to: OrderFormStatus::Accepted,
		});
		assert_eq!(err.status_code(), 409);
		assert_eq!(err.to_error_response().error, "INVALID_TRANSITION");
	}
}
