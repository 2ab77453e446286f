//! Configuration builder for tests and local development.

use crate::{
	ApiConfig, Config, LogisticsConfig, MarketConfig, PaymentConfig, StorageConfig,
};
use market_types::LogisticsCompany;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and an instant, always-successful simulated
/// payment provider.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	market_id: String,
	storage_primary: String,
	storage_config: toml::Value,
	payment_primary: String,
	payment_config: toml::Value,
	currency: String,
	companies: Vec<LogisticsCompany>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::Table::new())
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut simulated = toml::Table::new();
		simulated.insert("delay_ms".into(), toml::Value::Integer(0));

		Self {
			market_id: "test-market".to_string(),
			storage_primary: "memory".to_string(),
			storage_config: empty_table(),
			payment_primary: "simulated".to_string(),
			payment_config: toml::Value::Table(simulated),
			currency: "NGN".to_string(),
			companies: Vec::new(),
			api: None,
		}
	}

	pub fn market_id(mut self, id: impl Into<String>) -> Self {
		self.market_id = id.into();
		self
	}

	/// Sets the primary storage implementation and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	/// Sets the primary payment provider and its table.
	pub fn payment(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.payment_primary = primary.into();
		self.payment_config = config;
		self
	}

	pub fn currency(mut self, currency: impl Into<String>) -> Self {
		self.currency = currency.into();
		self
	}

	/// Adds a company to the logistics catalog.
	pub fn logistics_company(mut self, company: LogisticsCompany) -> Self {
		self.companies.push(company);
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			market: MarketConfig { id: self.market_id },
			storage: StorageConfig {
				implementations: HashMap::from([(
					self.storage_primary.clone(),
					self.storage_config,
				)]),
				primary: self.storage_primary,
			},
			payment: PaymentConfig {
				implementations: HashMap::from([(
					self.payment_primary.clone(),
					self.payment_config,
				)]),
				primary: self.payment_primary,
				currency: self.currency,
			},
			logistics: LogisticsConfig {
				companies: self.companies,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::Decimal;

	#[test]
	fn test_defaults_round_trip_through_validation() {
		let config = ConfigBuilder::new()
			.logistics_company(LogisticsCompany {
				id: "swift".into(),
				name: "Swift".into(),
				price: Decimal::from(5),
				delivery_time: "1 day".into(),
				description: String::new(),
			})
			.build();

		let text = toml::to_string(&config).unwrap();
		let parsed: Config = text.parse().unwrap();
		assert_eq!(parsed.storage.primary, "memory");
		assert_eq!(parsed.payment.primary, "simulated");
		assert_eq!(parsed.logistics.companies.len(), 1);
	}
}
