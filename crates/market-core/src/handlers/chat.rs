//! Chat threads between a buyer and a seller.
//!
//! A thread is stored as one record holding its messages in posting order.
//! Order forms issued from a thread appear in it as an order-form message.

use crate::engine::event_bus::EventBus;
use market_storage::{StorageError, StorageService};
use market_types::{
	current_timestamp, new_id, truncate_id, ChatEvent, ChatMessage, MarketEvent, MessageBody,
	StorageKey,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum ChatError {
	#[error("Invalid message: {0}")]
	Invalid(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Handler for posting to and reading chat threads.
pub struct ChatHandler {
	storage: Arc<StorageService>,
	event_bus: EventBus,
	/// Appends rewrite the whole thread record.
	append_lock: Mutex<()>,
}

impl ChatHandler {
	pub fn new(storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self {
			storage,
			event_bus,
			append_lock: Mutex::new(()),
		}
	}

	/// Posts a text message to a thread.
	#[instrument(skip_all, fields(thread_id = %truncate_id(thread_id)))]
	pub async fn post_message(
		&self,
		thread_id: &str,
		sender_id: &str,
		text: &str,
	) -> Result<ChatMessage, ChatError> {
		let text = text.trim();
		if text.is_empty() {
			return Err(ChatError::Invalid("message text cannot be empty".into()));
		}
		self.append(
			thread_id,
			sender_id,
			MessageBody::Text {
				text: text.to_string(),
			},
		)
		.await
	}

	/// Posts the inline order-form message for a newly issued form.
	pub(crate) async fn post_order_form(
		&self,
		thread_id: &str,
		sender_id: &str,
		order_form_id: &str,
	) -> Result<ChatMessage, ChatError> {
		self.append(
			thread_id,
			sender_id,
			MessageBody::OrderForm {
				order_form_id: order_form_id.to_string(),
			},
		)
		.await
	}

	/// Returns a thread's messages in posting order. Unknown threads are empty.
	pub async fn thread_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, ChatError> {
		match self
			.storage
			.retrieve(StorageKey::Messages.as_str(), thread_id)
			.await
		{
			Ok(messages) => Ok(messages),
			Err(StorageError::NotFound) => Ok(Vec::new()),
			Err(e) => Err(ChatError::Storage(e.to_string())),
		}
	}

	async fn append(
		&self,
		thread_id: &str,
		sender_id: &str,
		body: MessageBody,
	) -> Result<ChatMessage, ChatError> {
		if thread_id.trim().is_empty() {
			return Err(ChatError::Invalid("thread id cannot be empty".into()));
		}
		if sender_id.trim().is_empty() {
			return Err(ChatError::Invalid("sender id cannot be empty".into()));
		}

		let message = ChatMessage {
			id: new_id(),
			thread_id: thread_id.to_string(),
			sender_id: sender_id.to_string(),
			body,
			created_at: current_timestamp(),
		};

		{
			let _guard = self.append_lock.lock().await;
			let mut messages = self.thread_messages(thread_id).await?;
			messages.push(message.clone());
			self.storage
				.store(StorageKey::Messages.as_str(), thread_id, &messages)
				.await
				.map_err(|e| ChatError::Storage(e.to_string()))?;
		}

		tracing::debug!(message_id = %truncate_id(&message.id), "Message posted");

		self.event_bus
			.publish(MarketEvent::Chat(ChatEvent::MessagePosted {
				message: message.clone(),
			}))
			.ok();

		Ok(message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_storage::implementations::memory::MemoryStorage;

	fn handler() -> ChatHandler {
		ChatHandler::new(
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			EventBus::new(16),
		)
	}

	#[tokio::test]
	async fn test_messages_keep_posting_order() {
		let chat = handler();
		chat.post_message("t1", "buyer", "Do you have yams?").await.unwrap();
		chat.post_order_form("t1", "seller", "f1").await.unwrap();
		chat.post_message("t2", "buyer", "other thread").await.unwrap();

		let messages = chat.thread_messages("t1").await.unwrap();
		assert_eq!(messages.len(), 2);
		assert_eq!(
			messages[0].body,
			MessageBody::Text {
				text: "Do you have yams?".into()
			}
		);
		assert_eq!(
			messages[1].body,
			MessageBody::OrderForm {
				order_form_id: "f1".into()
			}
		);
	}

	#[tokio::test]
	async fn test_unknown_thread_is_empty() {
		assert!(handler().thread_messages("none").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_blank_message_rejected() {
		let chat = handler();
		assert!(matches!(
			chat.post_message("t1", "buyer", "   ").await,
			Err(ChatError::Invalid(_))
		));
		assert!(matches!(
			chat.post_message("t1", "", "hi").await,
			Err(ChatError::Invalid(_))
		));
	}

	#[tokio::test]
	async fn test_post_publishes_event() {
		let chat = handler();
		let mut rx = chat.event_bus.subscribe();
		let posted = chat.post_message("t1", "buyer", "hello").await.unwrap();

		match rx.recv().await.unwrap() {
			MarketEvent::Chat(ChatEvent::MessagePosted { message }) => {
				assert_eq!(message.id, posted.id)
			},
			other => panic!("unexpected event {:?}", other),
		}
	}
}
