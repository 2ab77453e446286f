//! Simulated payment provider.
//!
//! Stands in for the payment widget during development: waits for a fixed
//! delay, as if the buyer were completing the widget, then reports the
//! configured outcome.

use crate::{
	PaymentError, PaymentFactory, PaymentInterface, PaymentOutcome, PaymentRegistry,
	PaymentRequest,
};
use async_trait::async_trait;
use market_types::{
	new_id, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::time::Duration;

const DEFAULT_DELAY_MS: u64 = 2000;

/// What the simulated widget reports once the delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedOutcome {
	Success,
	Cancel,
}

/// Simulated payment provider.
pub struct SimulatedPayment {
	delay: Duration,
	outcome: SimulatedOutcome,
}

impl SimulatedPayment {
	pub fn new(delay: Duration, outcome: SimulatedOutcome) -> Self {
		Self { delay, outcome }
	}
}

#[async_trait]
impl PaymentInterface for SimulatedPayment {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SimulatedPaymentSchema)
	}

	async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
		tokio::time::sleep(self.delay).await;

		match self.outcome {
			SimulatedOutcome::Success => {
				let reference = request
					.reference
					.clone()
					.unwrap_or_else(|| format!("sim_{}", new_id()));
				Ok(PaymentOutcome::Completed { reference })
			},
			SimulatedOutcome::Cancel => Ok(PaymentOutcome::Cancelled),
		}
	}
}

/// Configuration schema for SimulatedPayment.
pub struct SimulatedPaymentSchema;

impl ConfigSchema for SimulatedPaymentSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"delay_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
				Field::new("outcome", FieldType::String).with_validator(|v| match v.as_str() {
					Some("success") | Some("cancel") => Ok(()),
					_ => Err("outcome must be 'success' or 'cancel'".into()),
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a simulated provider from configuration.
///
/// Configuration parameters:
/// - `delay_ms`: Simulated widget time (default: 2000)
/// - `outcome`: "success" or "cancel" (default: "success")
pub fn create_payment(config: &toml::Value) -> Result<Box<dyn PaymentInterface>, PaymentError> {
	SimulatedPaymentSchema
		.validate(config)
		.map_err(|e| PaymentError::Configuration(e.to_string()))?;

	let delay_ms = config
		.get("delay_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_DELAY_MS);
	let outcome = match config.get("outcome").and_then(|v| v.as_str()) {
		Some("cancel") => SimulatedOutcome::Cancel,
		_ => SimulatedOutcome::Success,
	};

	Ok(Box::new(SimulatedPayment::new(
		Duration::from_millis(delay_ms),
		outcome,
	)))
}

/// Registry for the simulated provider.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "simulated";
	type Factory = PaymentFactory;

	fn factory() -> Self::Factory {
		create_payment
	}
}

impl PaymentRegistry for Registry {}
