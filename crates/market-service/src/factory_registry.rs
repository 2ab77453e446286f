//! Registry of every storage backend and payment provider the binary ships.
//!
//! Configuration names implementations by string; this module resolves those
//! names to factory functions and hands them to the engine builder.

use market_config::Config;
use market_core::{MarketBuilder, MarketEngine, MarketFactories};
use market_payment::PaymentFactory;
use market_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub payment: HashMap<String, PaymentFactory>,
}

impl FactoryRegistry {
	fn new() -> Self {
		Self {
			storage: HashMap::new(),
			payment: HashMap::new(),
		}
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in market_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}

		for (name, factory) in market_payment::get_all_implementations() {
			tracing::debug!("Registering payment implementation: {}", name);
			registry.payment.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Picks the factories named in a config section, failing on unknown names.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the market engine from configuration using the registered factories.
pub fn build_market_from_config(config: Config) -> Result<MarketEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let payment_factories =
		build_factories!(registry, config.payment.implementations, payment, "payment");

	let engine = MarketBuilder::new(config).build(MarketFactories {
		storage_factories,
		payment_factories,
	})?;
	Ok(engine)
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_config::builders::ConfigBuilder;

	#[test]
	fn test_registry_knows_all_implementations() {
		let registry = get_registry();
		for name in ["file", "memory", "remote"] {
			assert!(registry.storage.contains_key(name), "missing storage {}", name);
		}
		for name in ["gateway", "simulated"] {
			assert!(registry.payment.contains_key(name), "missing payment {}", name);
		}
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config = ConfigBuilder::new()
			.storage("redis", toml::Value::Table(toml::Table::new()))
			.build();
		let err = build_market_from_config(config).err().unwrap();
		let message = err.to_string();
		assert!(message.contains("Unknown storage implementation 'redis'"));
		assert!(message.contains("file, memory, remote"));
	}

	#[test]
	fn test_build_from_default_config() {
		let engine = build_market_from_config(ConfigBuilder::new().build()).unwrap();
		assert_eq!(engine.config().market.id, "test-market");
	}
}
