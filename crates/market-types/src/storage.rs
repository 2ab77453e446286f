//! Storage-related types for the marketplace.

use std::str::FromStr;

/// Storage namespaces for the persisted collections.
///
/// Keys are formed as `<namespace>:<id>`; the namespace doubles as the
/// collection name for remote backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order forms issued from chat
	OrderForms,
	/// Paid orders
	Orders,
	/// Maps an order form id to the order created from it
	OrderByForm,
	/// Maps a gateway payment reference to the order it paid for
	OrderByPaymentReference,
	/// Chat messages
	Messages,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::OrderForms => "order_forms",
			StorageKey::Orders => "orders",
			StorageKey::OrderByForm => "order_by_form",
			StorageKey::OrderByPaymentReference => "order_by_payment_reference",
			StorageKey::Messages => "messages",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::OrderForms,
			Self::Orders,
			Self::OrderByForm,
			Self::OrderByPaymentReference,
			Self::Messages,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"order_forms" => Ok(Self::OrderForms),
			"orders" => Ok(Self::Orders),
			"order_by_form" => Ok(Self::OrderByForm),
			"order_by_payment_reference" => Ok(Self::OrderByPaymentReference),
			"messages" => Ok(Self::Messages),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
