//! Marketplace engine tying the order flow together.
//!
//! The engine owns the storage and payment services, the two state machines
//! and one handler per stage of the flow. Every operation is a direct call;
//! `run` only drains the event bus into the log.

pub mod event_bus;
pub mod lifecycle;

use crate::catalog::LogisticsCatalog;
use crate::handlers::{
	ChatError, ChatHandler, CheckoutError, CheckoutHandler, LogisticsError, LogisticsHandler,
	OrderFormError, OrderFormHandler,
};
use crate::state::{OrderFormStateMachine, OrderStateError, OrderStateMachine};
use market_config::Config;
use market_payment::PaymentService;
use market_storage::StorageService;
use market_types::{
	truncate_id, ChatEvent, ChatMessage, CheckoutRequest, IssueOrderFormRequest, LogisticsCompany,
	MarketEvent, Order, OrderEvent, OrderForm, OrderFormEvent, PartyFilter, ShipmentSummary,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Main marketplace engine.
#[derive(Clone)]
pub struct MarketEngine {
	pub(crate) config: Config,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) event_bus: event_bus::EventBus,
	pub(crate) catalog: Arc<LogisticsCatalog>,
	pub(crate) orders: Arc<OrderStateMachine>,
	pub(crate) chat: Arc<ChatHandler>,
	pub(crate) order_form_handler: Arc<OrderFormHandler>,
	pub(crate) checkout_handler: Arc<CheckoutHandler>,
	pub(crate) logistics_handler: Arc<LogisticsHandler>,
}

impl MarketEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		payment: Arc<PaymentService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let forms = Arc::new(OrderFormStateMachine::new(storage.clone()));
		let orders = Arc::new(OrderStateMachine::new(storage.clone()));
		let catalog = Arc::new(LogisticsCatalog::new(&config.logistics.companies));

		let chat = Arc::new(ChatHandler::new(storage.clone(), event_bus.clone()));

		let order_form_handler = Arc::new(OrderFormHandler::new(
			forms.clone(),
			chat.clone(),
			event_bus.clone(),
		));

		let checkout_handler = Arc::new(CheckoutHandler::new(
			forms,
			orders.clone(),
			payment,
			event_bus.clone(),
			config.payment.currency.clone(),
		));

		let logistics_handler = Arc::new(LogisticsHandler::new(
			orders.clone(),
			catalog.clone(),
			event_bus.clone(),
		));

		Self {
			config,
			storage,
			event_bus,
			catalog,
			orders,
			chat,
			order_form_handler,
			checkout_handler,
			logistics_handler,
		}
	}

	pub async fn issue_order_form(
		&self,
		request: IssueOrderFormRequest,
	) -> Result<OrderForm, OrderFormError> {
		self.order_form_handler.issue(request).await
	}

	pub async fn accept_order_form(
		&self,
		form_id: &str,
		buyer_id: &str,
	) -> Result<OrderForm, OrderFormError> {
		self.order_form_handler.accept(form_id, buyer_id).await
	}

	pub async fn reject_order_form(
		&self,
		form_id: &str,
		buyer_id: &str,
	) -> Result<OrderForm, OrderFormError> {
		self.order_form_handler.reject(form_id, buyer_id).await
	}

	pub async fn get_order_form(&self, form_id: &str) -> Result<OrderForm, OrderFormError> {
		self.order_form_handler.get(form_id).await
	}

	pub async fn list_order_forms(
		&self,
		filter: &PartyFilter,
	) -> Result<Vec<OrderForm>, OrderFormError> {
		self.order_form_handler.list(filter).await
	}

	/// Pays for an accepted order form, creating the order.
	pub async fn checkout(
		&self,
		form_id: &str,
		request: CheckoutRequest,
	) -> Result<Order, CheckoutError> {
		self.checkout_handler.checkout(form_id, request).await
	}

	pub fn logistics_companies(&self) -> &[LogisticsCompany] {
		self.logistics_handler.companies()
	}

	/// Chooses a logistics company for a paid order, shipping it.
	pub async fn select_logistics(
		&self,
		order_id: &str,
		buyer_id: &str,
		company_id: &str,
	) -> Result<ShipmentSummary, LogisticsError> {
		self.logistics_handler
			.select(order_id, buyer_id, company_id)
			.await
	}

	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		self.orders.get_order(order_id).await
	}

	pub async fn list_orders(&self, filter: &PartyFilter) -> Result<Vec<Order>, OrderStateError> {
		self.orders.list_orders(filter).await
	}

	pub async fn post_message(
		&self,
		thread_id: &str,
		sender_id: &str,
		text: &str,
	) -> Result<ChatMessage, ChatError> {
		self.chat.post_message(thread_id, sender_id, text).await
	}

	pub async fn thread_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
		self.chat.thread_messages(thread_id).await
	}

	/// Logs every published event until Ctrl+C.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();

		loop {
			tokio::select! {
				received = events.recv() => match received {
					Ok(event) => log_event(&event),
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "Event log fell behind");
					},
					Err(RecvError::Closed) => break,
				},

				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.shutdown().await
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}
}

fn log_event(event: &MarketEvent) {
	match event {
		MarketEvent::OrderForm(OrderFormEvent::Issued { form }) => {
			tracing::debug!(form_id = %truncate_id(&form.id), "event: order form issued");
		},
		MarketEvent::OrderForm(OrderFormEvent::Accepted { form_id }) => {
			tracing::debug!(form_id = %truncate_id(form_id), "event: order form accepted");
		},
		MarketEvent::OrderForm(OrderFormEvent::Rejected { form_id }) => {
			tracing::debug!(form_id = %truncate_id(form_id), "event: order form rejected");
		},
		MarketEvent::Order(OrderEvent::Paid { order }) => {
			tracing::debug!(order_id = %truncate_id(&order.id), "event: order paid");
		},
		MarketEvent::Order(OrderEvent::PaymentFailed { form_id, reason }) => {
			tracing::debug!(form_id = %truncate_id(form_id), reason = %reason, "event: payment failed");
		},
		MarketEvent::Order(OrderEvent::Shipped {
			order_id,
			logistics_company_id,
		}) => {
			tracing::debug!(
				order_id = %truncate_id(order_id),
				logistics_company_id = %logistics_company_id,
				"event: order shipped"
			);
		},
		MarketEvent::Chat(ChatEvent::MessagePosted { message }) => {
			tracing::trace!(thread_id = %truncate_id(&message.thread_id), "event: message posted");
		},
	}
}
