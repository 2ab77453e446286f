//! Order state machine implementation.
//!
//! Orders are created already paid, so the lifecycle starts at `paid` in
//! practice: `pending -> paid -> shipped`. `delivered` is modelled but no
//! transition reaches it. Each order form maps to at most one order through
//! the `order_by_form` index, and each payment reference to at most one order
//! through `order_by_payment_reference`.

use market_storage::{StorageError, StorageService};
use market_types::{
	current_timestamp, Order, OrderStatus, PartyFilter, PaymentStatus, StorageKey,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	#[error("Order form {0} already has an order")]
	AlreadyExists(String),
	#[error("Payment reference {0} already paid for another order")]
	ReferenceReused(String),
	#[error("Payment for order {0} is not completed")]
	PaymentIncomplete(String),
}

fn storage_error(order_id: &str, e: StorageError) -> OrderStateError {
	match e {
		StorageError::NotFound => OrderStateError::OrderNotFound(order_id.to_string()),
		other => OrderStateError::Storage(other.to_string()),
	}
}

/// Manages order state transitions and persistence
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	/// Serializes read-modify-write cycles and order creation.
	write_lock: Mutex<()>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	/// Stores a new order and indexes it by its order form and payment
	/// reference.
	///
	/// Fails with `AlreadyExists` if the form already produced an order, and
	/// with `ReferenceReused` if the payment reference already paid for one.
	pub async fn create_order(&self, order: &Order) -> Result<(), OrderStateError> {
		let _guard = self.write_lock.lock().await;

		if self
			.storage
			.exists(StorageKey::OrderByForm.as_str(), &order.order_form_id)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?
		{
			return Err(OrderStateError::AlreadyExists(order.order_form_id.clone()));
		}
		if let Some(reference) = &order.payment_reference {
			if self
				.storage
				.exists(StorageKey::OrderByPaymentReference.as_str(), reference)
				.await
				.map_err(|e| OrderStateError::Storage(e.to_string()))?
			{
				return Err(OrderStateError::ReferenceReused(reference.clone()));
			}
		}

		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, order)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;

		// Store form_id -> order_id mapping
		self.storage
			.store(
				StorageKey::OrderByForm.as_str(),
				&order.order_form_id,
				&order.id,
			)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;

		if let Some(reference) = &order.payment_reference {
			self.storage
				.store(
					StorageKey::OrderByPaymentReference.as_str(),
					reference,
					&order.id,
				)
				.await
				.map_err(|e| OrderStateError::Storage(e.to_string()))?;
		}
		Ok(())
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| storage_error(order_id, e))
	}

	/// Returns the order created from a form, if any.
	pub async fn order_for_form(&self, form_id: &str) -> Result<Option<Order>, OrderStateError> {
		let order_id: String = match self
			.storage
			.retrieve(StorageKey::OrderByForm.as_str(), form_id)
			.await
		{
			Ok(id) => id,
			Err(StorageError::NotFound) => return Ok(None),
			Err(e) => return Err(OrderStateError::Storage(e.to_string())),
		};
		self.get_order(&order_id).await.map(Some)
	}

	/// Lists orders visible to a party, newest first.
	pub async fn list_orders(&self, filter: &PartyFilter) -> Result<Vec<Order>, OrderStateError> {
		let mut orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;

		orders.retain(|o| filter.matches(&o.buyer_id, &o.seller_id));
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(orders)
	}

	/// Records the chosen logistics company and moves the order to shipped.
	///
	/// Requires completed payment.
	pub async fn mark_shipped(
		&self,
		order_id: &str,
		logistics_company_id: &str,
	) -> Result<Order, OrderStateError> {
		self.apply(order_id, |order| {
			if order.payment_status != PaymentStatus::Completed {
				return Err(OrderStateError::PaymentIncomplete(order.id.clone()));
			}
			Self::check_transition(order.status, OrderStatus::Shipped)?;
			order.status = OrderStatus::Shipped;
			order.logistics_company_id = Some(logistics_company_id.to_string());
			Ok(())
		})
		.await
	}

	/// Read-modify-write under the write lock. Nothing is written if the
	/// closure fails.
	async fn apply<F>(&self, order_id: &str, change: F) -> Result<Order, OrderStateError>
	where
		F: FnOnce(&mut Order) -> Result<(), OrderStateError>,
	{
		let _guard = self.write_lock.lock().await;

		let mut order = self.get_order(order_id).await?;
		change(&mut order)?;
		order.updated_at = current_timestamp();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| storage_error(order_id, e))?;

		Ok(order)
	}

	fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderStateError> {
		if Self::is_valid_transition(from, to) {
			Ok(())
		} else {
			Err(OrderStateError::InvalidTransition { from, to })
		}
	}

	/// Checks if a state transition is valid
	fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		// Static transition table - each state maps to allowed next states
		static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
			HashMap::from([
				(OrderStatus::Pending, HashSet::from([OrderStatus::Paid])),
				(OrderStatus::Paid, HashSet::from([OrderStatus::Shipped])),
				(OrderStatus::Shipped, HashSet::new()),   // terminal
				(OrderStatus::Delivered, HashSet::new()), // unreachable
			])
		});

		TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::implementations::memory::MemoryStorage;
	use market_types::Decimal;

	fn order(id: &str, form_id: &str, payment_status: PaymentStatus, status: OrderStatus) -> Order {
		Order {
			id: id.into(),
			order_form_id: form_id.into(),
			buyer_id: "b1".into(),
			seller_id: "s1".into(),
			product_id: "p1".into(),
			quantity: 2,
			total_price: Decimal::from(20),
			currency: "NGN".into(),
			payment_status,
			payment_reference: None,
			status,
			logistics_company_id: None,
			created_at: 1,
			updated_at: 1,
			paid_at: None,
		}
	}

	fn machine() -> OrderStateMachine {
		OrderStateMachine::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn test_one_order_per_form() {
		let machine = machine();
		machine
			.create_order(&order("o1", "f1", PaymentStatus::Completed, OrderStatus::Paid))
			.await
			.unwrap();

		let result = machine
			.create_order(&order("o2", "f1", PaymentStatus::Completed, OrderStatus::Paid))
			.await;
		assert!(matches!(result, Err(OrderStateError::AlreadyExists(f)) if f == "f1"));

		let found = machine.order_for_form("f1").await.unwrap().unwrap();
		assert_eq!(found.id, "o1");
		assert!(machine.order_for_form("f2").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_ship_requires_completed_payment() {
		let machine = machine();
		machine
			.create_order(&order("o1", "f1", PaymentStatus::Pending, OrderStatus::Pending))
			.await
			.unwrap();

		let result = machine.mark_shipped("o1", "swift").await;
		assert!(matches!(result, Err(OrderStateError::PaymentIncomplete(_))));

		let stored = machine.get_order("o1").await.unwrap();
		assert_eq!(stored.status, OrderStatus::Pending);
		assert!(stored.logistics_company_id.is_none());
	}

	#[tokio::test]
	async fn test_ship_paid_order_once() {
		let machine = machine();
		machine
			.create_order(&order("o1", "f1", PaymentStatus::Completed, OrderStatus::Paid))
			.await
			.unwrap();

		let shipped = machine.mark_shipped("o1", "swift").await.unwrap();
		assert_eq!(shipped.status, OrderStatus::Shipped);
		assert_eq!(shipped.logistics_company_id.as_deref(), Some("swift"));

		assert!(matches!(
			machine.mark_shipped("o1", "haul").await,
			Err(OrderStateError::InvalidTransition {
				from: OrderStatus::Shipped,
				to: OrderStatus::Shipped
			})
		));
	}

	#[tokio::test]
	async fn test_payment_reference_pays_once() {
		let machine = machine();
		let mut first = order("o1", "f1", PaymentStatus::Completed, OrderStatus::Paid);
		first.payment_reference = Some("T123".into());
		machine.create_order(&first).await.unwrap();

		let mut second = order("o2", "f2", PaymentStatus::Completed, OrderStatus::Paid);
		second.payment_reference = Some("T123".into());
		let result = machine.create_order(&second).await;
		assert!(matches!(result, Err(OrderStateError::ReferenceReused(r)) if r == "T123"));

		// The rejected order leaves no trace behind.
		assert!(machine.order_for_form("f2").await.unwrap().is_none());
		assert!(matches!(
			machine.get_order("o2").await,
			Err(OrderStateError::OrderNotFound(_))
		));

		let mut third = order("o3", "f3", PaymentStatus::Completed, OrderStatus::Paid);
		third.payment_reference = Some("T124".into());
		machine.create_order(&third).await.unwrap();
	}

	#[test]
	fn test_delivered_is_unreachable() {
		for from in [
			OrderStatus::Pending,
			OrderStatus::Paid,
			OrderStatus::Shipped,
			OrderStatus::Delivered,
		] {
			assert!(!OrderStateMachine::is_valid_transition(from, OrderStatus::Delivered));
		}
		assert!(OrderStateMachine::is_valid_transition(
			OrderStatus::Paid,
			OrderStatus::Shipped
		));
	}
}
