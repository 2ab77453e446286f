//! Static logistics catalog.

use market_types::{Decimal, LogisticsCompany};

/// Read-only list of logistics companies a buyer can choose from.
#[derive(Debug, Clone)]
pub struct LogisticsCatalog {
	companies: Vec<LogisticsCompany>,
}

impl LogisticsCatalog {
	/// Builds the catalog from configuration, falling back to the built-in
	/// companies when none are configured.
	pub fn new(configured: &[LogisticsCompany]) -> Self {
		let companies = if configured.is_empty() {
			default_companies()
		} else {
			configured.to_vec()
		};
		Self { companies }
	}

	pub fn companies(&self) -> &[LogisticsCompany] {
		&self.companies
	}

	pub fn find(&self, company_id: &str) -> Option<&LogisticsCompany> {
		self.companies.iter().find(|c| c.id == company_id)
	}
}

fn company(id: &str, name: &str, price: i64, delivery_time: &str, description: &str) -> LogisticsCompany {
	LogisticsCompany {
		id: id.to_string(),
		name: name.to_string(),
		price: Decimal::from(price),
		delivery_time: delivery_time.to_string(),
		description: description.to_string(),
	}
}

/// Built-in catalog used when the configuration names no companies.
pub fn default_companies() -> Vec<LogisticsCompany> {
	vec![
		company(
			"swift-courier",
			"Swift Courier",
			5,
			"1-2 days",
			"Same-city motorbike delivery for small parcels",
		),
		company(
			"farmlink-haulage",
			"FarmLink Haulage",
			12,
			"2-4 days",
			"Refrigerated trucks for perishable produce",
		),
		company(
			"greenway-freight",
			"Greenway Freight",
			20,
			"3-7 days",
			"Inter-state bulk freight for large orders",
		),
	]
}
