//! Builder pattern for constructing market engines.
//!
//! The configuration names implementations by string; the caller supplies a
//! factory per name. Only configured implementations are instantiated, and
//! every configured one must load.

use crate::engine::{event_bus::EventBus, MarketEngine};
use market_config::Config;
use market_payment::{PaymentError, PaymentInterface, PaymentService};
use market_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each pluggable component, keyed by implementation name.
pub struct MarketFactories<SF, PF> {
	pub storage_factories: HashMap<String, SF>,
	pub payment_factories: HashMap<String, PF>,
}

/// Builder for constructing a MarketEngine with pluggable implementations.
pub struct MarketBuilder {
	config: Config,
}

impl MarketBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the MarketEngine using the factories for each component type.
	pub fn build<SF, PF>(self, factories: MarketFactories<SF, PF>) -> Result<MarketEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		PF: Fn(&toml::Value) -> Result<Box<dyn PaymentInterface>, PaymentError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let provider = load_primary(
			"payment",
			&self.config.payment.primary,
			&self.config.payment.implementations,
			&factories.payment_factories,
		)?;
		let payment = Arc::new(PaymentService::new(provider));

		Ok(MarketEngine::new(
			self.config,
			storage,
			payment,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}

/// Instantiates every configured implementation of a component and returns
/// the primary one.
fn load_primary<T, E, F>(
	component: &str,
	primary: &str,
	configured: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in configured {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' failed to load or has no factory",
			component, primary
		))
	})
}
