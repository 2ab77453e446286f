//! Logistics catalog types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Order;

/// A delivery provider the buyer can choose after payment.
///
/// Companies are static reference data loaded from configuration and are
/// never created or modified by the order flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsCompany {
	pub id: String,
	pub name: String,
	/// Flat delivery fee added on top of the order total.
	pub price: Decimal,
	/// Human-readable delivery estimate, e.g. "2-3 days".
	#[serde(alias = "delivery_time")]
	pub delivery_time: String,
	#[serde(default)]
	pub description: String,
}

/// Result of confirming a logistics company for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSummary {
	pub order: Order,
	pub company: LogisticsCompany,
	/// Order total plus the delivery fee.
	pub grand_total: Decimal,
}
