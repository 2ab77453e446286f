//! Order form and order types for the marketplace.
//!
//! An [`OrderForm`] is the proposal a seller issues from a chat thread. Once
//! the buyer accepts it and payment completes, an [`Order`] is derived from it
//! and later advanced to shipped when a logistics company is chosen.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computes the total price for a quantity of a product.
///
/// Used both when a form is issued and again at checkout, so the two values
/// are produced by the same arithmetic. `None` when the product overflows.
pub fn compute_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
	unit_price.checked_mul(Decimal::from(quantity))
}

/// Status of an order form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderFormStatus {
	/// Issued by the seller, awaiting the buyer's response.
	Pending,
	/// Accepted by the buyer; eligible for checkout.
	Accepted,
	/// Rejected by the buyer. Terminal.
	Rejected,
}

impl fmt::Display for OrderFormStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderFormStatus::Pending => write!(f, "pending"),
			OrderFormStatus::Accepted => write!(f, "accepted"),
			OrderFormStatus::Rejected => write!(f, "rejected"),
		}
	}
}

/// A purchase proposal issued by a seller to a buyer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderForm {
	/// Unique identifier for this form.
	pub id: String,
	pub product_id: String,
	pub product_name: String,
	/// Unit price at the time the form was issued.
	pub product_price: Decimal,
	#[serde(default)]
	pub product_image: Option<String>,
	#[serde(default)]
	pub product_description: Option<String>,
	pub quantity: u32,
	/// `product_price * quantity`.
	pub total_price: Decimal,
	pub seller_id: String,
	pub buyer_id: String,
	/// Chat thread this form was issued in, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<String>,
	pub status: OrderFormStatus,
	pub created_at: u64,
	#[serde(default)]
	pub updated_at: u64,
}

impl OrderForm {
	/// Recomputes the total from the stored unit price and quantity.
	pub fn recomputed_total(&self) -> Option<Decimal> {
		compute_total(self.product_price, self.quantity)
	}
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
	Pending,
	Completed,
	Failed,
}

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Created but not yet paid.
	Pending,
	/// Payment completed.
	Paid,
	/// Logistics company selected and the goods handed over.
	Shipped,
	/// Received by the buyer.
	Delivered,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "pending"),
			OrderStatus::Paid => write!(f, "paid"),
			OrderStatus::Shipped => write!(f, "shipped"),
			OrderStatus::Delivered => write!(f, "delivered"),
		}
	}
}

/// A confirmed, paid purchase derived from an accepted order form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	pub id: String,
	/// The accepted form this order was created from.
	pub order_form_id: String,
	pub buyer_id: String,
	pub seller_id: String,
	pub product_id: String,
	pub quantity: u32,
	pub total_price: Decimal,
	/// ISO 4217 currency code the payment was made in.
	pub currency: String,
	pub payment_status: PaymentStatus,
	/// Reference returned by the payment provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_reference: Option<String>,
	pub status: OrderStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub logistics_company_id: Option<String>,
	pub created_at: u64,
	#[serde(default)]
	pub updated_at: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub paid_at: Option<u64>,
}

/// Filter applied when listing forms or orders for a dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyFilter {
	pub buyer_id: Option<String>,
	pub seller_id: Option<String>,
}

impl PartyFilter {
	/// Returns true when the given buyer/seller pair passes the filter.
	pub fn matches(&self, buyer_id: &str, seller_id: &str) -> bool {
		self.buyer_id.as_deref().is_none_or(|b| b == buyer_id)
			&& self.seller_id.as_deref().is_none_or(|s| s == seller_id)
	}
}
