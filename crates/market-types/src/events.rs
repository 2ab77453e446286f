//! Event types published by the marketplace engine.
//!
//! Events flow through the engine's event bus so that other parts of the
//! service (notifications, logging) can react to lifecycle changes without
//! being called directly by the handlers.

use crate::{ChatMessage, Order, OrderForm};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all marketplace events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	/// Events from order form issuance and responses.
	OrderForm(OrderFormEvent),
	/// Events from checkout and logistics.
	Order(OrderEvent),
	/// Events from chat threads.
	Chat(ChatEvent),
}

/// Events related to order forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderFormEvent {
	/// A seller issued a new form.
	Issued { form: OrderForm },
	/// The buyer accepted the form.
	Accepted { form_id: String },
	/// The buyer rejected the form.
	Rejected { form_id: String },
}

/// Events related to orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// Payment completed and the order was created.
	Paid { order: Order },
	/// Payment was cancelled or failed; no order was created.
	PaymentFailed { form_id: String, reason: String },
	/// A logistics company was selected.
	Shipped {
		order_id: String,
		logistics_company_id: String,
	},
}

/// Events related to chat threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
	/// A message was posted to a thread.
	MessagePosted { message: ChatMessage },
}
