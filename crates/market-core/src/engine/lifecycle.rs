//! Startup and shutdown for the marketplace engine.

use super::{EngineError, MarketEngine};
use market_types::StorageKey;

impl MarketEngine {
	/// Checks the storage backend is reachable before serving requests.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(market_id = %self.config.market.id, "Initializing market engine");

		self.storage
			.exists(StorageKey::OrderForms.as_str(), "startup-check")
			.await
			.map_err(|e| EngineError::Service(format!("Storage unavailable: {}", e)))?;

		tracing::info!(
			logistics_companies = self.catalog.companies().len(),
			"Market engine ready"
		);
		Ok(())
	}

	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down market engine");
		Ok(())
	}
}
