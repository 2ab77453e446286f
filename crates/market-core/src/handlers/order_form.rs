//! Order form handler: issuing forms and recording the buyer's response.

use crate::engine::event_bus::EventBus;
use crate::handlers::ChatHandler;
use crate::state::{OrderFormStateError, OrderFormStateMachine};
use market_types::{
	compute_total, current_timestamp, new_id, truncate_id, Decimal, IssueOrderFormRequest,
	MarketEvent, OrderForm, OrderFormEvent, OrderFormStatus, PartyFilter,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while issuing or responding to order forms.
#[derive(Debug, Error)]
pub enum OrderFormError {
	#[error("Invalid order form: {0}")]
	Invalid(String),
	#[error("Order form not found: {0}")]
	NotFound(String),
	#[error("{0}")]
	Forbidden(String),
	#[error("Order form is {from} and cannot become {to}")]
	InvalidTransition {
		from: OrderFormStatus,
		to: OrderFormStatus,
	},
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<OrderFormStateError> for OrderFormError {
	fn from(e: OrderFormStateError) -> Self {
		match e {
			OrderFormStateError::NotFound(id) => OrderFormError::NotFound(id),
			OrderFormStateError::InvalidTransition { from, to } => {
				OrderFormError::InvalidTransition { from, to }
			},
			OrderFormStateError::Storage(msg) => OrderFormError::Storage(msg),
		}
	}
}

/// Handler for the order form lifecycle.
pub struct OrderFormHandler {
	state_machine: Arc<OrderFormStateMachine>,
	chat: Arc<ChatHandler>,
	event_bus: EventBus,
}

impl OrderFormHandler {
	pub fn new(
		state_machine: Arc<OrderFormStateMachine>,
		chat: Arc<ChatHandler>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state_machine,
			chat,
			event_bus,
		}
	}

	/// Issues a new pending order form from the seller to the buyer.
	///
	/// When the request names a thread, the form is also posted there.
	#[instrument(skip_all, fields(seller_id = %truncate_id(&request.seller_id)))]
	pub async fn issue(&self, request: IssueOrderFormRequest) -> Result<OrderForm, OrderFormError> {
		validate_issue(&request)?;
		let total_price = compute_total(request.product_price, request.quantity).ok_or_else(|| {
			OrderFormError::Invalid("product_price * quantity is too large".into())
		})?;

		let now = current_timestamp();
		let form = OrderForm {
			id: new_id(),
			total_price,
			product_id: request.product_id,
			product_name: request.product_name,
			product_price: request.product_price,
			product_image: request.product_image,
			product_description: request.product_description,
			quantity: request.quantity,
			seller_id: request.seller_id,
			buyer_id: request.buyer_id,
			thread_id: request.thread_id,
			status: OrderFormStatus::Pending,
			created_at: now,
			updated_at: now,
		};

		self.state_machine.store_form(&form).await?;

		if let Some(thread_id) = &form.thread_id {
			// The form is already stored; a failed chat post only loses the inline preview.
			if let Err(e) = self
				.chat
				.post_order_form(thread_id, &form.seller_id, &form.id)
				.await
			{
				tracing::warn!(form_id = %truncate_id(&form.id), error = %e, "Failed to post order form to thread");
			}
		}

		tracing::info!(
			form_id = %truncate_id(&form.id),
			total = %form.total_price,
			"Order form issued"
		);

		self.event_bus
			.publish(MarketEvent::OrderForm(OrderFormEvent::Issued { form: form.clone() }))
			.ok();

		Ok(form)
	}

	#[instrument(skip_all, fields(form_id = %truncate_id(form_id)))]
	pub async fn accept(&self, form_id: &str, buyer_id: &str) -> Result<OrderForm, OrderFormError> {
		let form = self
			.respond(form_id, buyer_id, OrderFormStatus::Accepted)
			.await?;
		self.event_bus
			.publish(MarketEvent::OrderForm(OrderFormEvent::Accepted {
				form_id: form.id.clone(),
			}))
			.ok();
		Ok(form)
	}

	#[instrument(skip_all, fields(form_id = %truncate_id(form_id)))]
	pub async fn reject(&self, form_id: &str, buyer_id: &str) -> Result<OrderForm, OrderFormError> {
		let form = self
			.respond(form_id, buyer_id, OrderFormStatus::Rejected)
			.await?;
		self.event_bus
			.publish(MarketEvent::OrderForm(OrderFormEvent::Rejected {
				form_id: form.id.clone(),
			}))
			.ok();
		Ok(form)
	}

	pub async fn get(&self, form_id: &str) -> Result<OrderForm, OrderFormError> {
		Ok(self.state_machine.get_form(form_id).await?)
	}

	pub async fn list(&self, filter: &PartyFilter) -> Result<Vec<OrderForm>, OrderFormError> {
		Ok(self.state_machine.list_forms(filter).await?)
	}

	async fn respond(
		&self,
		form_id: &str,
		buyer_id: &str,
		status: OrderFormStatus,
	) -> Result<OrderForm, OrderFormError> {
		// The buyer of a form never changes, so checking outside the write lock is safe.
		let form = self.state_machine.get_form(form_id).await?;
		if form.buyer_id != buyer_id {
			return Err(OrderFormError::Forbidden(
				"Only the buyer can respond to an order form".into(),
			));
		}

		let form = self
			.state_machine
			.transition_form_status(form_id, status)
			.await?;
		tracing::info!(status = %form.status, "Order form answered");
		Ok(form)
	}
}

fn validate_issue(request: &IssueOrderFormRequest) -> Result<(), OrderFormError> {
	let required = [
		("productId", &request.product_id),
		("productName", &request.product_name),
		("sellerId", &request.seller_id),
		("buyerId", &request.buyer_id),
	];
	for (field, value) in required {
		if value.trim().is_empty() {
			return Err(OrderFormError::Invalid(format!("{} is required", field)));
		}
	}
	if request.quantity == 0 {
		return Err(OrderFormError::Invalid("quantity must be at least 1".into()));
	}
	if request.product_price <= Decimal::ZERO {
		return Err(OrderFormError::Invalid("productPrice must be positive".into()));
	}
	if request.seller_id == request.buyer_id {
		return Err(OrderFormError::Invalid(
			"seller and buyer must be different parties".into(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::{implementations::memory::MemoryStorage, StorageService};
	use market_types::MessageBody;
	use std::str::FromStr;

	fn handler() -> (OrderFormHandler, Arc<ChatHandler>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let bus = EventBus::new(16);
		let chat = Arc::new(ChatHandler::new(storage.clone(), bus.clone()));
		let handler = OrderFormHandler::new(
			Arc::new(OrderFormStateMachine::new(storage)),
			chat.clone(),
			bus,
		);
		(handler, chat)
	}

	fn request() -> IssueOrderFormRequest {
		IssueOrderFormRequest {
			product_id: "p1".into(),
			product_name: "White yam".into(),
			product_price: Decimal::from_str("10.00").unwrap(),
			product_image: None,
			product_description: Some("Tubers, 2kg each".into()),
			quantity: 2,
			seller_id: "farmer".into(),
			buyer_id: "buyer".into(),
			thread_id: Some("t1".into()),
		}
	}

	#[tokio::test]
	async fn test_issue_computes_total_and_posts_to_thread() {
		let (handler, chat) = handler();
		let form = handler.issue(request()).await.unwrap();

		assert_eq!(form.total_price, Decimal::from_str("20.00").unwrap());
		assert_eq!(form.status, OrderFormStatus::Pending);

		let messages = chat.thread_messages("t1").await.unwrap();
		assert_eq!(
			messages[0].body,
			MessageBody::OrderForm {
				order_form_id: form.id.clone()
			}
		);
		assert_eq!(messages[0].sender_id, "farmer");
	}

	#[tokio::test]
	async fn test_issue_validation() {
		let (handler, _) = handler();

		let mut zero_quantity = request();
		zero_quantity.quantity = 0;
		assert!(matches!(
			handler.issue(zero_quantity).await,
			Err(OrderFormError::Invalid(_))
		));

		let mut free = request();
		free.product_price = Decimal::ZERO;
		assert!(matches!(handler.issue(free).await, Err(OrderFormError::Invalid(_))));

		let mut overflowing = request();
		overflowing.product_price = Decimal::MAX;
		assert!(matches!(
			handler.issue(overflowing).await,
			Err(OrderFormError::Invalid(_))
		));

		let mut self_dealing = request();
		self_dealing.buyer_id = "farmer".into();
		assert!(matches!(
			handler.issue(self_dealing).await,
			Err(OrderFormError::Invalid(_))
		));
	}

	#[tokio::test]
	async fn test_only_buyer_can_respond() {
		let (handler, _) = handler();
		let form = handler.issue(request()).await.unwrap();

		assert!(matches!(
			handler.accept(&form.id, "farmer").await,
			Err(OrderFormError::Forbidden(_))
		));

		let accepted = handler.accept(&form.id, "buyer").await.unwrap();
		assert_eq!(accepted.status, OrderFormStatus::Accepted);
	}

	#[tokio::test]
	async fn test_rejected_form_cannot_be_accepted() {
		let (handler, _) = handler();
		let form = handler.issue(request()).await.unwrap();

		handler.reject(&form.id, "buyer").await.unwrap();
		assert!(matches!(
			handler.accept(&form.id, "buyer").await,
			Err(OrderFormError::InvalidTransition {
				from: OrderFormStatus::Rejected,
				to: OrderFormStatus::Accepted
			})
		));
	}

	#[tokio::test]
	async fn test_unknown_form() {
		let (handler, _) = handler();
		assert!(matches!(
			handler.accept("missing", "buyer").await,
			Err(OrderFormError::NotFound(_))
		));
	}
}
