//! Payment providers for checkout.
//!
//! Checkout hands a [`PaymentRequest`] to the configured provider and gets
//! back a [`PaymentOutcome`]: either a completed payment with the provider's
//! reference, or a cancellation. The buyer-facing widget lives outside this
//! service; providers here either simulate its callback or verify the
//! reference it produced with the gateway.

use async_trait::async_trait;
use market_types::{ConfigSchema, Decimal, ImplementationRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod gateway;
	pub mod simulated;
}

/// Errors that can occur while taking a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
	/// The provider could not be reached or returned an unexpected response.
	#[error("Network error: {0}")]
	Network(String),
	/// The provider declined or failed the payment.
	#[error("Payment declined: {0}")]
	Declined(String),
	/// The provider has no record of the reference.
	#[error("Unknown payment reference: {0}")]
	UnknownReference(String),
	/// The amount the provider charged differs from the order total.
	#[error("Amount mismatch: expected {expected}, provider reported {actual}")]
	AmountMismatch { expected: i64, actual: i64 },
	/// The request cannot be expressed to the provider.
	#[error("Invalid payment request: {0}")]
	InvalidRequest(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A request to charge the buyer for an accepted order form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
	/// Form being paid for; used as the idempotency context for logs.
	pub order_form_id: String,
	pub amount: Decimal,
	/// ISO 4217 currency code.
	pub currency: String,
	pub customer_email: Option<String>,
	/// Reference the widget returned on its success callback, if any.
	pub reference: Option<String>,
}

/// Result of a payment attempt that reached a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
	/// Payment succeeded.
	Completed { reference: String },
	/// The buyer closed the widget or the payment was abandoned.
	Cancelled,
}

/// Converts an amount to the provider's minor currency unit (e.g. kobo, cents).
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
	let minor = amount
		.checked_mul(Decimal::ONE_HUNDRED)
		.ok_or_else(|| PaymentError::InvalidRequest(format!("Amount {} out of range", amount)))?;
	if minor.fract() != Decimal::ZERO {
		return Err(PaymentError::InvalidRequest(format!(
			"Amount {} has more than two decimal places",
			amount
		)));
	}
	i64::try_from(minor.trunc())
		.map_err(|_| PaymentError::InvalidRequest(format!("Amount {} out of range", amount)))
}

/// Interface implemented by every payment provider.
#[async_trait]
pub trait PaymentInterface: Send + Sync {
	/// Returns the configuration schema for this provider.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Charges the buyer, or confirms a charge the widget already made.
	async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError>;
}

/// Type alias for payment factory functions.
pub type PaymentFactory = fn(&toml::Value) -> Result<Box<dyn PaymentInterface>, PaymentError>;

/// Registry trait for payment implementations.
pub trait PaymentRegistry: ImplementationRegistry<Factory = PaymentFactory> {}

/// Get all registered payment implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PaymentFactory)> {
	use implementations::{gateway, simulated};

	vec![
		(gateway::Registry::NAME, gateway::Registry::factory()),
		(simulated::Registry::NAME, simulated::Registry::factory()),
	]
}

/// Service wrapping the primary payment provider.
pub struct PaymentService {
	provider: Box<dyn PaymentInterface>,
}

impl PaymentService {
	pub fn new(provider: Box<dyn PaymentInterface>) -> Self {
		Self { provider }
	}

	/// Takes a payment through the provider.
	///
	/// Rejects non-positive amounts before contacting the provider.
	pub async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
		if request.amount <= Decimal::ZERO {
			return Err(PaymentError::InvalidRequest(format!(
				"Amount must be positive, got {}",
				request.amount
			)));
		}

		tracing::debug!(
			order_form_id = %request.order_form_id,
			amount = %request.amount,
			currency = %request.currency,
			"Requesting payment"
		);

		let outcome = self.provider.charge(request).await?;
		match &outcome {
			PaymentOutcome::Completed { reference } => {
				tracing::info!(order_form_id = %request.order_form_id, reference = %reference, "Payment completed");
			},
			PaymentOutcome::Cancelled => {
				tracing::info!(order_form_id = %request.order_form_id, "Payment cancelled");
			},
		}
		Ok(outcome)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_to_minor_units() {
		assert_eq!(to_minor_units(Decimal::from_str("20.00").unwrap()).unwrap(), 2000);
		assert_eq!(to_minor_units(Decimal::from_str("0.5").unwrap()).unwrap(), 50);
		assert!(to_minor_units(Decimal::from_str("1.005").unwrap()).is_err());
	}

	#[test]
	fn test_to_minor_units_overflow() {
		assert!(matches!(
			to_minor_units(Decimal::MAX),
			Err(PaymentError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn test_service_rejects_zero_amount() {
		let provider = implementations::simulated::SimulatedPayment::new(
			std::time::Duration::ZERO,
			implementations::simulated::SimulatedOutcome::Success,
		);
		let service = PaymentService::new(Box::new(provider));
		let request = PaymentRequest {
			order_form_id: "f1".into(),
			amount: Decimal::ZERO,
			currency: "NGN".into(),
			customer_email: None,
			reference: None,
		};
		assert!(matches!(
			service.charge(&request).await,
			Err(PaymentError::InvalidRequest(_))
		));
	}
}
