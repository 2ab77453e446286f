//! Storage module for the marketplace.
//!
//! Order forms, orders and chat messages are flat JSON records keyed by
//! `<namespace>:<id>`. Backends only deal in bytes; [`StorageService`] adds
//! typed access on top. Available backends are in-memory, local files, and a
//! remote REST collection.

use async_trait::async_trait;
use market_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod remote;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level key/value interface implemented by every storage backend.
///
/// Writes are whole-record overwrites; backends make no attempt to merge
/// concurrent writers, so the last write wins.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, overwriting any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists the ids stored under a namespace (the part after `<namespace>:`).
	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, remote};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(remote::Registry::NAME, remote::Registry::factory()),
	]
}

/// Joins a namespace and id into a storage key.
pub fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

/// Splits a storage key into namespace and id.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
	key.split_once(':')
}

/// Typed storage operations over a backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a value as JSON, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&storage_key(namespace, id), bytes)
			.await
	}

	/// Retrieves and deserializes a value.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves every record in a namespace.
	///
	/// Records removed between listing and reading are skipped.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_keys(namespace).await?;
		let mut records = Vec::with_capacity(ids.len());
		for id in ids {
			match self.retrieve(namespace, &id).await {
				Ok(record) => records.push(record),
				Err(StorageError::NotFound) => {
					tracing::debug!(namespace, id = %id, "Record vanished while listing");
				},
				Err(e) => return Err(e),
			}
		}
		Ok(records)
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(namespace, id)).await
	}

	/// Overwrites an existing value; fails with NotFound if it doesn't exist.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = storage_key(namespace, id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Serialize, Deserialize, PartialEq)]
	struct Record {
		name: String,
	}

	#[tokio::test]
	async fn test_update_requires_existing_record() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let record = Record { name: "a".into() };

		let result = service.update("orders", "1", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		service.store("orders", "1", &record).await.unwrap();
		let updated = Record { name: "b".into() };
		service.update("orders", "1", &updated).await.unwrap();
		let got: Record = service.retrieve("orders", "1").await.unwrap();
		assert_eq!(got, updated);
	}

	#[tokio::test]
	async fn test_retrieve_all_is_namespaced() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		service
			.store("orders", "1", &Record { name: "o1".into() })
			.await
			.unwrap();
		service
			.store("orders", "2", &Record { name: "o2".into() })
			.await
			.unwrap();
		service
			.store("order_forms", "1", &Record { name: "f1".into() })
			.await
			.unwrap();

		let mut orders: Vec<Record> = service.retrieve_all("orders").await.unwrap();
		orders.sort_by(|a, b| a.name.cmp(&b.name));
		assert_eq!(
			orders,
			vec![Record { name: "o1".into() }, Record { name: "o2".into() }]
		);
	}

	#[tokio::test]
	async fn test_retrieve_wrong_shape_is_serialization_error() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		service.store("orders", "1", &42u32).await.unwrap();
		let result: Result<Record, _> = service.retrieve("orders", "1").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}

	#[test]
	fn test_split_key() {
		assert_eq!(split_key("orders:abc"), Some(("orders", "abc")));
		assert_eq!(split_key("nocolon"), None);
	}
}
