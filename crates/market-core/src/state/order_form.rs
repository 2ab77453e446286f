//! Order form state machine.
//!
//! Forms move `pending -> accepted` or `pending -> rejected`; both outcomes
//! are terminal. Forms never expire.

use market_storage::{StorageError, StorageService};
use market_types::{current_timestamp, OrderForm, OrderFormStatus, PartyFilter, StorageKey};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum OrderFormStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: OrderFormStatus,
		to: OrderFormStatus,
	},
	#[error("Order form not found: {0}")]
	NotFound(String),
}

fn storage_error(form_id: &str, e: StorageError) -> OrderFormStateError {
	match e {
		StorageError::NotFound => OrderFormStateError::NotFound(form_id.to_string()),
		other => OrderFormStateError::Storage(other.to_string()),
	}
}

/// Manages order form transitions and persistence.
pub struct OrderFormStateMachine {
	storage: Arc<StorageService>,
	/// Serializes read-modify-write cycles on forms.
	write_lock: Mutex<()>,
}

impl OrderFormStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	/// Stores a newly issued form.
	pub async fn store_form(&self, form: &OrderForm) -> Result<(), OrderFormStateError> {
		self.storage
			.store(StorageKey::OrderForms.as_str(), &form.id, form)
			.await
			.map_err(|e| OrderFormStateError::Storage(e.to_string()))
	}

	pub async fn get_form(&self, form_id: &str) -> Result<OrderForm, OrderFormStateError> {
		self.storage
			.retrieve(StorageKey::OrderForms.as_str(), form_id)
			.await
			.map_err(|e| storage_error(form_id, e))
	}

	/// Lists forms visible to a party, newest first.
	pub async fn list_forms(
		&self,
		filter: &PartyFilter,
	) -> Result<Vec<OrderForm>, OrderFormStateError> {
		let mut forms: Vec<OrderForm> = self
			.storage
			.retrieve_all(StorageKey::OrderForms.as_str())
			.await
			.map_err(|e| OrderFormStateError::Storage(e.to_string()))?;

		forms.retain(|f| filter.matches(&f.buyer_id, &f.seller_id));
		forms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(forms)
	}

	/// Moves a form to a new status, rejecting transitions the table forbids.
	pub async fn transition_form_status(
		&self,
		form_id: &str,
		new_status: OrderFormStatus,
	) -> Result<OrderForm, OrderFormStateError> {
		let _guard = self.write_lock.lock().await;

		let mut form = self.get_form(form_id).await?;
		if !Self::is_valid_transition(form.status, new_status) {
			return Err(OrderFormStateError::InvalidTransition {
				from: form.status,
				to: new_status,
			});
		}

		form.status = new_status;
		form.updated_at = current_timestamp();

		self.storage
			.update(StorageKey::OrderForms.as_str(), form_id, &form)
			.await
			.map_err(|e| storage_error(form_id, e))?;

		Ok(form)
	}

	fn is_valid_transition(from: OrderFormStatus, to: OrderFormStatus) -> bool {
		static TRANSITIONS: Lazy<HashMap<OrderFormStatus, HashSet<OrderFormStatus>>> =
			Lazy::new(|| {
				HashMap::from([
					(
						OrderFormStatus::Pending,
						HashSet::from([OrderFormStatus::Accepted, OrderFormStatus::Rejected]),
					),
					(OrderFormStatus::Accepted, HashSet::new()), // terminal
					(OrderFormStatus::Rejected, HashSet::new()), // terminal
				])
			});

		TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
	}
}
