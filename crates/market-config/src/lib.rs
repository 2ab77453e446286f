//! Configuration for the marketplace order service.
//!
//! Configuration is TOML. String values may reference environment variables
//! as `${VAR}` or `${VAR:-default}`, which keeps bearer tokens and gateway
//! keys out of the file.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["storage.toml", "payment.toml"]` to include other files
//! - Each top-level section must be unique across all files

mod loader;

/// Builders for test and development configurations.
#[cfg(any(test, feature = "testing"))]
pub mod builders {
	pub mod config;
	pub use config::ConfigBuilder;
}

use market_types::{LogisticsCompany, Decimal};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this marketplace instance.
	pub market: MarketConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
	/// Payment provider selection.
	pub payment: PaymentConfig,
	/// Logistics catalog.
	#[serde(default)]
	pub logistics: LogisticsConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity of this marketplace instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
	/// Unique identifier, used in logs.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for payment providers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
	/// Which provider checkout uses.
	pub primary: String,
	/// Map of provider names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Default ISO 4217 currency for checkout.
	#[serde(default = "default_currency")]
	pub currency: String,
}

/// Returns the default checkout currency.
fn default_currency() -> String {
	"NGN".to_string()
}

/// Logistics catalog configuration.
///
/// When no companies are configured the engine falls back to its built-in
/// catalog.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogisticsConfig {
	#[serde(default)]
	pub companies: Vec<LogisticsCompany>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration. Permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

fn is_currency_code(code: &str) -> bool {
	code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.market.id.trim().is_empty() {
			return Err(ConfigError::Validation("Market ID cannot be empty".into()));
		}

		// Storage
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Payment
		if self.payment.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one payment implementation must be configured".into(),
			));
		}
		if !self
			.payment
			.implementations
			.contains_key(&self.payment.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary payment '{}' not found in implementations",
				self.payment.primary
			)));
		}
		if !is_currency_code(&self.payment.currency) {
			return Err(ConfigError::Validation(format!(
				"Payment currency '{}' must be a 3-letter uppercase ISO code",
				self.payment.currency
			)));
		}

		self.validate_logistics()?;

		if let Some(ref api) = self.api {
			if api.enabled && api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"API timeout_seconds must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}

	/// Validates the logistics catalog.
	///
	/// Ids must be unique and non-empty, and fees cannot be negative.
	fn validate_logistics(&self) -> Result<(), ConfigError> {
		let mut seen = HashSet::new();
		for company in &self.logistics.companies {
			if company.id.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Logistics company id cannot be empty".into(),
				));
			}
			if company.name.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Logistics company '{}' must have a name",
					company.id
				)));
			}
			if company.price < Decimal::ZERO {
				return Err(ConfigError::Validation(format!(
					"Logistics company '{}' has a negative price",
					company.id
				)));
			}
			if !seen.insert(company.id.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate logistics company id '{}'",
					company.id
				)));
			}
		}
		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
