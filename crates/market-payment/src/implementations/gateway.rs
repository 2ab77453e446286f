//! Hosted payment gateway provider.
//!
//! The buyer pays through the gateway's inline widget in the browser; the
//! widget's success callback yields a transaction reference which checkout
//! forwards here. This provider verifies that reference with
//! `GET {base_url}/transaction/verify/{reference}` using the merchant secret
//! key, and checks the charged amount and currency against the order.
//! A request without a reference means the widget was closed unpaid.

use crate::{
	to_minor_units, PaymentError, PaymentFactory, PaymentInterface, PaymentOutcome,
	PaymentRegistry, PaymentRequest,
};
use async_trait::async_trait;
use market_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Envelope returned by the verify endpoint.
#[derive(Debug, Deserialize)]
struct VerifyResponse {
	status: bool,
	#[serde(default)]
	message: String,
	data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
	/// "success", "failed", "abandoned", ...
	status: String,
	/// Charged amount in minor units.
	amount: i64,
	currency: String,
	reference: String,
}

/// Payment gateway provider.
pub struct GatewayPayment {
	client: Client,
	base_url: Url,
	secret_key: SecretString,
}

impl GatewayPayment {
	pub fn new(
		base_url: &str,
		secret_key: SecretString,
		timeout: Duration,
	) -> Result<Self, PaymentError> {
		let base_url = Url::parse(base_url)
			.map_err(|e| PaymentError::Configuration(format!("Invalid base_url: {}", e)))?;
		if base_url.cannot_be_a_base() {
			return Err(PaymentError::Configuration(format!(
				"base_url cannot carry a path: {}",
				base_url
			)));
		}
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| PaymentError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			base_url,
			secret_key,
		})
	}

	/// The reference is pushed as a single percent-encoded path segment.
	fn verify_url(&self, reference: &str) -> Result<Url, PaymentError> {
		if reference == "." || reference == ".." {
			return Err(PaymentError::InvalidRequest(format!(
				"Invalid payment reference: '{}'",
				reference
			)));
		}
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| PaymentError::Configuration("base_url cannot carry a path".into()))?
			.pop_if_empty()
			.extend(["transaction", "verify", reference]);
		Ok(url)
	}

	async fn verify(&self, reference: &str) -> Result<VerifyData, PaymentError> {
		let response = self
			.client
			.get(self.verify_url(reference)?)
			.header(header::AUTHORIZATION, self.secret_key.bearer())
			.send()
			.await
			.map_err(|e| PaymentError::Network(e.to_string()))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(PaymentError::UnknownReference(reference.to_string()));
		}
		if !response.status().is_success() {
			return Err(PaymentError::Network(format!(
				"Gateway returned {}",
				response.status()
			)));
		}

		let body: VerifyResponse = response
			.json()
			.await
			.map_err(|e| PaymentError::Network(format!("Invalid gateway response: {}", e)))?;

		match body.data {
			Some(data) if body.status => Ok(data),
			_ => Err(PaymentError::Declined(body.message)),
		}
	}
}

#[async_trait]
impl PaymentInterface for GatewayPayment {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(GatewayPaymentSchema)
	}

	async fn charge(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
		let reference = match request.reference.as_deref() {
			Some(r) if !r.is_empty() => r,
			_ => return Ok(PaymentOutcome::Cancelled),
		};
		let expected = to_minor_units(request.amount)?;

		let data = self.verify(reference).await?;

		match data.status.as_str() {
			"success" => {},
			"abandoned" => return Ok(PaymentOutcome::Cancelled),
			other => return Err(PaymentError::Declined(other.to_string())),
		}
		if !data.currency.eq_ignore_ascii_case(&request.currency) {
			return Err(PaymentError::Declined(format!(
				"Currency mismatch: expected {}, got {}",
				request.currency, data.currency
			)));
		}
		if data.amount != expected {
			return Err(PaymentError::AmountMismatch {
				expected,
				actual: data.amount,
			});
		}

		Ok(PaymentOutcome::Completed {
			reference: data.reference,
		})
	}
}

/// Configuration schema for GatewayPayment.
pub struct GatewayPaymentSchema;

impl ConfigSchema for GatewayPaymentSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("base_url", FieldType::Url),
				Field::new("secret_key", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if s.is_empty() => Err("secret_key cannot be empty".into()),
						_ => Ok(()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(120),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a gateway provider from configuration.
///
/// Configuration parameters:
/// - `base_url`: Gateway API root (required)
/// - `secret_key`: Merchant secret key (required)
/// - `timeout_seconds`: Request timeout (default: 30)
pub fn create_payment(config: &toml::Value) -> Result<Box<dyn PaymentInterface>, PaymentError> {
	GatewayPaymentSchema
		.validate(config)
		.map_err(|e| PaymentError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| PaymentError::Configuration("base_url is required".into()))?;
	let secret_key = config
		.get("secret_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| PaymentError::Configuration("secret_key is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	Ok(Box::new(GatewayPayment::new(
		base_url,
		secret_key,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the gateway provider.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "gateway";
	type Factory = PaymentFactory;

	fn factory() -> Self::Factory {
		create_payment
	}
}

impl PaymentRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
	use market_types::Decimal;
	use serde_json::{json, Value};
	use std::str::FromStr;

	async fn verify(Path(reference): Path<String>) -> Result<Json<Value>, AxumStatus> {
		let (status, amount) = match reference.as_str() {
			"ok" => ("success", 2000),
			"short" => ("success", 1500),
			"abandoned" => ("abandoned", 2000),
			"failed" => ("failed", 2000),
			_ => return Err(AxumStatus::NOT_FOUND),
		};
		Ok(Json(json!({
			"status": true,
			"message": "Verification successful",
			"data": {
				"status": status,
				"amount": amount,
				"currency": "NGN",
				"reference": reference,
			}
		})))
	}

	async fn spawn_gateway() -> String {
		let app = Router::new().route("/transaction/verify/{reference}", get(verify));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	fn request(reference: Option<&str>) -> PaymentRequest {
		PaymentRequest {
			order_form_id: "f1".into(),
			amount: Decimal::from_str("20.00").unwrap(),
			currency: "NGN".into(),
			customer_email: Some("buyer@example.com".into()),
			reference: reference.map(str::to_string),
		}
	}

	async fn provider() -> GatewayPayment {
		GatewayPayment::new(
			&spawn_gateway().await,
			SecretString::from("sk_test"),
			Duration::from_secs(5),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_verified_payment_completes() {
		let provider = provider().await;
		let outcome = provider.charge(&request(Some("ok"))).await.unwrap();
		assert_eq!(
			outcome,
			PaymentOutcome::Completed {
				reference: "ok".into()
			}
		);
	}

	#[tokio::test]
	async fn test_missing_reference_is_cancellation() {
		let provider = provider().await;
		assert_eq!(
			provider.charge(&request(None)).await.unwrap(),
			PaymentOutcome::Cancelled
		);
		assert_eq!(
			provider.charge(&request(Some("abandoned"))).await.unwrap(),
			PaymentOutcome::Cancelled
		);
	}

	#[tokio::test]
	async fn test_rejections() {
		let provider = provider().await;
		assert!(matches!(
			provider.charge(&request(Some("short"))).await,
			Err(PaymentError::AmountMismatch {
				expected: 2000,
				actual: 1500
			})
		));
		assert!(matches!(
			provider.charge(&request(Some("failed"))).await,
			Err(PaymentError::Declined(_))
		));
		assert!(matches!(
			provider.charge(&request(Some("missing"))).await,
			Err(PaymentError::UnknownReference(_))
		));
	}

	#[test]
	fn test_verify_url_encodes_reference() {
		let provider = GatewayPayment::new(
			"https://api.gateway.test/",
			SecretString::from("sk_test"),
			Duration::from_secs(1),
		)
		.unwrap();

		let url = provider.verify_url("T123").unwrap();
		assert_eq!(url.as_str(), "https://api.gateway.test/transaction/verify/T123");

		let url = provider.verify_url("../../admin").unwrap();
		assert_eq!(url.path(), "/transaction/verify/..%2F..%2Fadmin");

		let url = provider.verify_url("x?y=z").unwrap();
		assert_eq!(url.path(), "/transaction/verify/x%3Fy=z");
		assert!(url.query().is_none());

		assert!(matches!(
			provider.verify_url(".."),
			Err(PaymentError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn test_dot_dot_reference_never_reaches_gateway() {
		let provider = provider().await;
		assert!(matches!(
			provider.charge(&request(Some(".."))).await,
			Err(PaymentError::InvalidRequest(_))
		));
	}

	#[test]
	fn test_factory_requires_secret() {
		let config: toml::Value = toml::from_str("base_url = \"https://api.gateway.test\"").unwrap();
		assert!(matches!(
			create_payment(&config),
			Err(PaymentError::Configuration(_))
		));
	}
}
