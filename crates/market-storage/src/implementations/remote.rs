//! Remote REST collection storage backend.
//!
//! Records live in a backend service that exposes one collection per
//! namespace:
//!
//! - `GET    {base_url}/{namespace}/{id}` returns the record (404 if missing)
//! - `PUT    {base_url}/{namespace}/{id}` replaces the record
//! - `DELETE {base_url}/{namespace}/{id}` removes it
//! - `GET    {base_url}/{namespace}` returns a JSON array of ids
//!
//! Requests carry a bearer token when `auth_token` is configured.

use crate::{split_key, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use market_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use reqwest::{header, Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;

/// Remote storage implementation backed by a REST API.
pub struct RemoteStorage {
	client: Client,
	base_url: Url,
	auth_token: Option<SecretString>,
}

impl RemoteStorage {
	pub fn new(
		base_url: &str,
		auth_token: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, StorageError> {
		let base_url = Url::parse(base_url)
			.map_err(|e| StorageError::Configuration(format!("Invalid base_url: {}", e)))?;
		if base_url.cannot_be_a_base() {
			return Err(StorageError::Configuration(format!(
				"base_url cannot carry a path: {}",
				base_url
			)));
		}
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| StorageError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			base_url,
			auth_token,
		})
	}

	/// Appends percent-encoded path segments to the base URL.
	fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
		// `.` and `..` would be dropped or resolved by the URL parser.
		if let Some(bad) = segments
			.iter()
			.find(|s| s.is_empty() || **s == "." || **s == "..")
		{
			return Err(StorageError::Backend(format!(
				"Invalid path segment: '{}'",
				bad
			)));
		}
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| StorageError::Configuration("base_url cannot carry a path".into()))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn record_url(&self, key: &str) -> Result<Url, StorageError> {
		let (namespace, id) = split_key(key)
			.ok_or_else(|| StorageError::Backend(format!("Malformed storage key: {}", key)))?;
		self.endpoint(&[namespace, id])
	}

	fn collection_url(&self, namespace: &str) -> Result<Url, StorageError> {
		self.endpoint(&[namespace])
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.auth_token {
			Some(token) => request.header(header::AUTHORIZATION, token.bearer()),
			None => request,
		}
	}

	async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StorageError> {
		self.authorize(request)
			.send()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

fn unexpected(status: StatusCode) -> StorageError {
	StorageError::Backend(format!("Unexpected response status: {}", status))
}

#[async_trait]
impl StorageInterface for RemoteStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let url = self.record_url(key)?;
		let response = self.send(self.client.get(url)).await?;

		match response.status() {
			StatusCode::NOT_FOUND => Err(StorageError::NotFound),
			status if status.is_success() => response
				.bytes()
				.await
				.map(|b| b.to_vec())
				.map_err(|e| StorageError::Backend(e.to_string())),
			status => Err(unexpected(status)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let url = self.record_url(key)?;
		let request = self
			.client
			.put(url)
			.header(header::CONTENT_TYPE, "application/json")
			.body(value);
		let response = self.send(request).await?;

		if response.status().is_success() {
			Ok(())
		} else {
			Err(unexpected(response.status()))
		}
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let url = self.record_url(key)?;
		let response = self.send(self.client.delete(url)).await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(()),
			status if status.is_success() => Ok(()),
			status => Err(unexpected(status)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let url = self.record_url(key)?;
		let response = self.send(self.client.get(url)).await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(false),
			status if status.is_success() => Ok(true),
			status => Err(unexpected(status)),
		}
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let url = self.collection_url(namespace)?;
		let response = self.send(self.client.get(url)).await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(Vec::new()),
			status if status.is_success() => response
				.json::<Vec<String>>()
				.await
				.map_err(|e| StorageError::Serialization(e.to_string())),
			status => Err(unexpected(status)),
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RemoteStorageSchema)
	}
}

/// Configuration schema for RemoteStorage.
pub struct RemoteStorageSchema;

impl ConfigSchema for RemoteStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::Url)],
			vec![
				Field::new("auth_token", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a remote storage backend from configuration.
///
/// Configuration parameters:
/// - `base_url`: Root of the REST collections (required)
/// - `auth_token`: Bearer token sent with every request (optional)
/// - `timeout_seconds`: Per-request timeout (default: 30)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	RemoteStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("base_url is required".into()))?;
	let auth_token = config
		.get("auth_token")
		.and_then(|v| v.as_str())
		.filter(|s| !s.is_empty())
		.map(SecretString::from);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	Ok(Box::new(RemoteStorage::new(
		base_url,
		auth_token,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the remote backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "remote";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::Bytes,
		extract::{Path, State},
		http::{HeaderMap, StatusCode as AxumStatus},
		routing::get,
		Json, Router,
	};
	use std::collections::HashMap;
	use std::sync::{Arc, Mutex};

	type Records = Arc<Mutex<HashMap<String, Vec<u8>>>>;

	const TOKEN: &str = "test-token";

	fn authorized(headers: &HeaderMap) -> bool {
		headers
			.get(header::AUTHORIZATION)
			.and_then(|v| v.to_str().ok())
			== Some("Bearer test-token")
	}

	async fn get_record(
		State(records): State<Records>,
		Path((ns, id)): Path<(String, String)>,
		headers: HeaderMap,
	) -> Result<Vec<u8>, AxumStatus> {
		if !authorized(&headers) {
			return Err(AxumStatus::UNAUTHORIZED);
		}
		let records = records.lock().unwrap();
		records
			.get(&format!("{}:{}", ns, id))
			.cloned()
			.ok_or(AxumStatus::NOT_FOUND)
	}

	async fn put_record(
		State(records): State<Records>,
		Path((ns, id)): Path<(String, String)>,
		headers: HeaderMap,
		body: Bytes,
	) -> AxumStatus {
		if !authorized(&headers) {
			return AxumStatus::UNAUTHORIZED;
		}
		records
			.lock()
			.unwrap()
			.insert(format!("{}:{}", ns, id), body.to_vec());
		AxumStatus::NO_CONTENT
	}

	async fn delete_record(
		State(records): State<Records>,
		Path((ns, id)): Path<(String, String)>,
	) -> AxumStatus {
		match records.lock().unwrap().remove(&format!("{}:{}", ns, id)) {
			Some(_) => AxumStatus::NO_CONTENT,
			None => AxumStatus::NOT_FOUND,
		}
	}

	async fn list_records(
		State(records): State<Records>,
		Path(ns): Path<String>,
	) -> Json<Vec<String>> {
		let prefix = format!("{}:", ns);
		let ids = records
			.lock()
			.unwrap()
			.keys()
			.filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
			.collect();
		Json(ids)
	}

	async fn spawn_backend() -> String {
		let records: Records = Arc::new(Mutex::new(HashMap::new()));
		let app = Router::new()
			.route("/{ns}", get(list_records))
			.route(
				"/{ns}/{id}",
				get(get_record)
					.put(put_record)
					.delete(delete_record)
					.head(|| async { AxumStatus::METHOD_NOT_ALLOWED }),
			)
			.with_state(records);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	#[tokio::test]
	async fn test_remote_round_trip() {
		let base_url = spawn_backend().await;
		let storage = RemoteStorage::new(
			&base_url,
			Some(SecretString::from(TOKEN)),
			Duration::from_secs(5),
		)
		.unwrap();

		assert!(matches!(
			storage.get_bytes("orders:1").await,
			Err(StorageError::NotFound)
		));
		assert!(!storage.exists("orders:1").await.unwrap());

		storage.set_bytes("orders:1", b"{}".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("orders:1").await.unwrap(), b"{}".to_vec());
		assert!(storage.exists("orders:1").await.unwrap());
		assert_eq!(storage.list_keys("orders").await.unwrap(), vec!["1"]);

		storage.delete("orders:1").await.unwrap();
		storage.delete("orders:1").await.unwrap();
		assert!(storage.list_keys("orders").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_missing_token_is_backend_error() {
		let base_url = spawn_backend().await;
		let storage = RemoteStorage::new(&base_url, None, Duration::from_secs(5)).unwrap();

		let result = storage.get_bytes("orders:1").await;
		assert!(matches!(result, Err(StorageError::Backend(msg)) if msg.contains("401")));
	}

	#[test]
	fn test_record_url() {
		let storage =
			RemoteStorage::new("https://api.example.com/v1/", None, Duration::from_secs(1))
				.unwrap();
		assert_eq!(
			storage.record_url("orders:abc").unwrap().as_str(),
			"https://api.example.com/v1/orders/abc"
		);
		assert!(storage.record_url("orders").is_err());
	}

	#[test]
	fn test_record_url_cannot_leave_collection() {
		let storage =
			RemoteStorage::new("https://api.example.com/v1", None, Duration::from_secs(1))
				.unwrap();

		assert!(storage.record_url("messages:..").is_err());
		assert!(storage.record_url("messages:.").is_err());

		let url = storage.record_url("messages:x?y=z#frag").unwrap();
		assert_eq!(url.path(), "/v1/messages/x%3Fy=z%23frag");
		assert!(url.query().is_none());
		assert!(url.fragment().is_none());

		let url = storage.record_url("messages:../../admin").unwrap();
		assert_eq!(url.path(), "/v1/messages/..%2F..%2Fadmin");
	}

	#[tokio::test]
	async fn test_exists_uses_get() {
		// The stub backend answers HEAD with 405.
		let base_url = spawn_backend().await;
		let storage = RemoteStorage::new(
			&base_url,
			Some(SecretString::from(TOKEN)),
			Duration::from_secs(5),
		)
		.unwrap();
		storage.set_bytes("order_forms:f1", b"{}".to_vec()).await.unwrap();
		assert!(storage.exists("order_forms:f1").await.unwrap());
	}

	#[test]
	fn test_factory_requires_base_url() {
		let config: toml::Value = toml::from_str("auth_token = \"x\"").unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));

		let config: toml::Value =
			toml::from_str("base_url = \"http://localhost:9000\"\ntimeout_seconds = 5").unwrap();
		assert!(create_storage(&config).is_ok());
	}
}
