//! Logistics handler: picks a delivery company for a paid order.

use crate::catalog::LogisticsCatalog;
use crate::engine::event_bus::EventBus;
use crate::state::{OrderStateError, OrderStateMachine};
use market_types::{
	truncate_id, LogisticsCompany, MarketEvent, OrderEvent, OrderStatus, ShipmentSummary,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum LogisticsError {
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Unknown logistics company: {0}")]
	UnknownCompany(String),
	#[error("{0}")]
	Forbidden(String),
	#[error("Payment for order {0} is not completed")]
	PaymentIncomplete(String),
	#[error("Order is {from} and cannot become {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Invalid logistics selection: {0}")]
	Invalid(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<OrderStateError> for LogisticsError {
	fn from(e: OrderStateError) -> Self {
		match e {
			OrderStateError::OrderNotFound(id) => LogisticsError::OrderNotFound(id),
			OrderStateError::PaymentIncomplete(id) => LogisticsError::PaymentIncomplete(id),
			OrderStateError::InvalidTransition { from, to } => {
				LogisticsError::InvalidTransition { from, to }
			},
			other => LogisticsError::Storage(other.to_string()),
		}
	}
}

pub struct LogisticsHandler {
	orders: Arc<OrderStateMachine>,
	catalog: Arc<LogisticsCatalog>,
	event_bus: EventBus,
}

impl LogisticsHandler {
	pub fn new(
		orders: Arc<OrderStateMachine>,
		catalog: Arc<LogisticsCatalog>,
		event_bus: EventBus,
	) -> Self {
		Self {
			orders,
			catalog,
			event_bus,
		}
	}

	pub fn companies(&self) -> &[LogisticsCompany] {
		self.catalog.companies()
	}

	/// Assigns a logistics company to a paid order and marks it shipped.
	///
	/// The grand total is the order total plus the company's fee.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn select(
		&self,
		order_id: &str,
		buyer_id: &str,
		company_id: &str,
	) -> Result<ShipmentSummary, LogisticsError> {
		let company = self
			.catalog
			.find(company_id)
			.cloned()
			.ok_or_else(|| LogisticsError::UnknownCompany(company_id.to_string()))?;

		let order = self.orders.get_order(order_id).await?;
		if order.buyer_id != buyer_id {
			return Err(LogisticsError::Forbidden(
				"Only the buyer can choose logistics for an order".into(),
			));
		}

		// The order total is fixed once paid, so the sum is checked before shipping.
		let grand_total = order
			.total_price
			.checked_add(company.price)
			.ok_or_else(|| LogisticsError::Invalid("grand total overflows".into()))?;

		let order = self.orders.mark_shipped(order_id, &company.id).await?;

		tracing::info!(
			logistics_company_id = %company.id,
			grand_total = %grand_total,
			"Order shipped"
		);

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Shipped {
				order_id: order.id.clone(),
				logistics_company_id: company.id.clone(),
			}))
			.ok();

		Ok(ShipmentSummary {
			order,
			company,
			grand_total,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::{implementations::memory::MemoryStorage, StorageService};
	use market_types::{Decimal, Order, PaymentStatus};

	fn order(payment_status: PaymentStatus, status: OrderStatus) -> Order {
		Order {
			id: "o1".into(),
			order_form_id: "f1".into(),
			buyer_id: "buyer".into(),
			seller_id: "farmer".into(),
			product_id: "p1".into(),
			quantity: 2,
			total_price: Decimal::from(20),
			currency: "NGN".into(),
			payment_status,
			payment_reference: Some("ref".into()),
			status,
			logistics_company_id: None,
			created_at: 1,
			updated_at: 1,
			paid_at: Some(1),
		}
	}

	async fn handler_with(order: Order) -> LogisticsHandler {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStateMachine::new(storage));
		orders.create_order(&order).await.unwrap();
		LogisticsHandler::new(
			orders,
			Arc::new(LogisticsCatalog::new(&[])),
			EventBus::new(16),
		)
	}

	#[tokio::test]
	async fn test_select_ships_and_adds_fee() {
		let handler = handler_with(order(PaymentStatus::Completed, OrderStatus::Paid)).await;

		let summary = handler.select("o1", "buyer", "swift-courier").await.unwrap();
		assert_eq!(summary.grand_total, Decimal::from(25));
		assert_eq!(summary.order.status, OrderStatus::Shipped);
		assert_eq!(
			summary.order.logistics_company_id.as_deref(),
			Some("swift-courier")
		);
	}

	#[tokio::test]
	async fn test_fee_overflow_leaves_order_unshipped() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStateMachine::new(storage));
		orders
			.create_order(&order(PaymentStatus::Completed, OrderStatus::Paid))
			.await
			.unwrap();
		let catalog = LogisticsCatalog::new(&[LogisticsCompany {
			id: "priceless".into(),
			name: "Priceless Freight".into(),
			price: Decimal::MAX,
			delivery_time: "never".into(),
			description: String::new(),
		}]);
		let handler = LogisticsHandler::new(orders.clone(), Arc::new(catalog), EventBus::new(16));

		assert!(matches!(
			handler.select("o1", "buyer", "priceless").await,
			Err(LogisticsError::Invalid(_))
		));
		assert_eq!(orders.get_order("o1").await.unwrap().status, OrderStatus::Paid);
	}

	#[tokio::test]
	async fn test_unpaid_order_cannot_ship() {
		let handler = handler_with(order(PaymentStatus::Pending, OrderStatus::Pending)).await;
		assert!(matches!(
			handler.select("o1", "buyer", "swift-courier").await,
			Err(LogisticsError::PaymentIncomplete(_))
		));
	}

	#[tokio::test]
	async fn test_rejects_unknown_company_and_other_parties() {
		let handler = handler_with(order(PaymentStatus::Completed, OrderStatus::Paid)).await;
		assert!(matches!(
			handler.select("o1", "buyer", "teleport").await,
			Err(LogisticsError::UnknownCompany(_))
		));
		assert!(matches!(
			handler.select("o1", "farmer", "swift-courier").await,
			Err(LogisticsError::Forbidden(_))
		));
		assert!(matches!(
			handler.select("o2", "buyer", "swift-courier").await,
			Err(LogisticsError::OrderNotFound(_))
		));
	}
}
