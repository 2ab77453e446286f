//! Checkout handler: turns an accepted order form into a paid order.
//!
//! An order is written only after the payment provider reports a completed
//! payment. Cancelled or failed payments leave no order behind and publish
//! `OrderEvent::PaymentFailed`.

use crate::engine::event_bus::EventBus;
use crate::state::{OrderFormStateError, OrderFormStateMachine, OrderStateError, OrderStateMachine};
use market_payment::{PaymentError, PaymentOutcome, PaymentRequest, PaymentService};
use market_types::{
	current_timestamp, new_id, truncate_id, CheckoutRequest, Decimal, MarketEvent, Order,
	OrderEvent, OrderForm, OrderFormStatus, OrderStatus, PaymentStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
	#[error("Order form not found: {0}")]
	NotFound(String),
	#[error("{0}")]
	Forbidden(String),
	#[error("Order form is {0}, only accepted forms can be checked out")]
	NotAccepted(OrderFormStatus),
	#[error("Order form total {stored} does not match computed total {computed}")]
	TotalMismatch { stored: Decimal, computed: Decimal },
	#[error("Order form {0} has already been checked out")]
	AlreadyCheckedOut(String),
	#[error("Checkout for order form {0} is already in progress")]
	InProgress(String),
	#[error("Payment reference {0} has already paid for another order")]
	ReferenceReused(String),
	#[error("Invalid checkout request: {0}")]
	Invalid(String),
	#[error("Payment was cancelled")]
	PaymentCancelled,
	#[error("Payment failed: {0}")]
	Payment(String),
	#[error("Payment provider unavailable: {0}")]
	PaymentUnavailable(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<OrderFormStateError> for CheckoutError {
	fn from(e: OrderFormStateError) -> Self {
		match e {
			OrderFormStateError::NotFound(id) => CheckoutError::NotFound(id),
			other => CheckoutError::Storage(other.to_string()),
		}
	}
}

impl From<OrderStateError> for CheckoutError {
	fn from(e: OrderStateError) -> Self {
		match e {
			OrderStateError::AlreadyExists(form_id) => CheckoutError::AlreadyCheckedOut(form_id),
			OrderStateError::ReferenceReused(reference) => CheckoutError::ReferenceReused(reference),
			other => CheckoutError::Storage(other.to_string()),
		}
	}
}

/// Marks a form as being checked out until dropped.
struct InFlight<'a> {
	set: &'a Mutex<HashSet<String>>,
	form_id: String,
}

impl<'a> InFlight<'a> {
	fn claim(set: &'a Mutex<HashSet<String>>, form_id: &str) -> Option<Self> {
		let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
		if !guard.insert(form_id.to_string()) {
			return None;
		}
		Some(Self {
			set,
			form_id: form_id.to_string(),
		})
	}
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
		guard.remove(&self.form_id);
	}
}

fn is_currency_code(code: &str) -> bool {
	code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Handler for paying accepted order forms.
pub struct CheckoutHandler {
	forms: Arc<OrderFormStateMachine>,
	orders: Arc<OrderStateMachine>,
	payment: Arc<PaymentService>,
	event_bus: EventBus,
	default_currency: String,
	in_flight: Mutex<HashSet<String>>,
}

impl CheckoutHandler {
	pub fn new(
		forms: Arc<OrderFormStateMachine>,
		orders: Arc<OrderStateMachine>,
		payment: Arc<PaymentService>,
		event_bus: EventBus,
		default_currency: String,
	) -> Self {
		Self {
			forms,
			orders,
			payment,
			event_bus,
			default_currency,
			in_flight: Mutex::new(HashSet::new()),
		}
	}

	/// Charges the buyer for an accepted form and creates the paid order.
	#[instrument(skip_all, fields(form_id = %truncate_id(form_id)))]
	pub async fn checkout(
		&self,
		form_id: &str,
		request: CheckoutRequest,
	) -> Result<Order, CheckoutError> {
		let form = self.forms.get_form(form_id).await?;
		if form.buyer_id != request.buyer_id {
			return Err(CheckoutError::Forbidden(
				"Only the buyer can check out an order form".into(),
			));
		}
		if form.status != OrderFormStatus::Accepted {
			return Err(CheckoutError::NotAccepted(form.status));
		}

		let computed = form
			.recomputed_total()
			.ok_or_else(|| CheckoutError::Invalid("order total overflows".into()))?;
		if computed != form.total_price {
			return Err(CheckoutError::TotalMismatch {
				stored: form.total_price,
				computed,
			});
		}

		let currency = request
			.currency
			.as_deref()
			.map(|c| c.trim().to_ascii_uppercase())
			.unwrap_or_else(|| self.default_currency.clone());
		if !is_currency_code(&currency) {
			return Err(CheckoutError::Invalid(format!(
				"currency '{}' is not a 3-letter ISO code",
				currency
			)));
		}

		let _in_flight = InFlight::claim(&self.in_flight, &form.id)
			.ok_or_else(|| CheckoutError::InProgress(form.id.clone()))?;

		if self.orders.order_for_form(&form.id).await?.is_some() {
			return Err(CheckoutError::AlreadyCheckedOut(form.id.clone()));
		}

		let payment = PaymentRequest {
			order_form_id: form.id.clone(),
			amount: computed,
			currency: currency.clone(),
			customer_email: request.email,
			reference: request.payment_reference,
		};

		match self.payment.charge(&payment).await {
			Ok(PaymentOutcome::Completed { reference }) => {
				self.create_paid_order(&form, currency, reference).await
			},
			Ok(PaymentOutcome::Cancelled) => {
				self.publish_failure(&form.id, "cancelled");
				Err(CheckoutError::PaymentCancelled)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Payment failed");
				self.publish_failure(&form.id, &e.to_string());
				Err(match e {
					PaymentError::Network(msg) => CheckoutError::PaymentUnavailable(msg),
					other => CheckoutError::Payment(other.to_string()),
				})
			},
		}
	}

	async fn create_paid_order(
		&self,
		form: &OrderForm,
		currency: String,
		reference: String,
	) -> Result<Order, CheckoutError> {
		let now = current_timestamp();
		let order = Order {
			id: new_id(),
			order_form_id: form.id.clone(),
			buyer_id: form.buyer_id.clone(),
			seller_id: form.seller_id.clone(),
			product_id: form.product_id.clone(),
			quantity: form.quantity,
			total_price: form.total_price,
			currency,
			payment_status: PaymentStatus::Completed,
			payment_reference: Some(reference),
			status: OrderStatus::Paid,
			logistics_company_id: None,
			created_at: now,
			updated_at: now,
			paid_at: Some(now),
		};

		if let Err(e) = self.orders.create_order(&order).await {
			// The buyer has been charged at this point.
			tracing::error!(
				order_id = %truncate_id(&order.id),
				payment_reference = ?order.payment_reference,
				error = %e,
				"Failed to persist paid order"
			);
			return Err(e.into());
		}

		tracing::info!(
			order_id = %truncate_id(&order.id),
			total = %order.total_price,
			currency = %order.currency,
			"Order paid"
		);

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Paid {
				order: order.clone(),
			}))
			.ok();

		Ok(order)
	}

	fn publish_failure(&self, form_id: &str, reason: &str) {
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::PaymentFailed {
				form_id: form_id.to_string(),
				reason: reason.to_string(),
			}))
			.ok();
	}
}
