//! Chat thread types.
//!
//! Buyers and sellers talk in threads; order forms are posted into a thread
//! as messages so the buyer can respond inline.

use serde::{Deserialize, Serialize};

/// Content of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageBody {
	/// Plain text.
	Text { text: String },
	/// An order form issued in the thread.
	#[serde(rename_all = "camelCase")]
	OrderForm { order_form_id: String },
}

/// A single message in a buyer/seller thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
	pub id: String,
	pub thread_id: String,
	pub sender_id: String,
	pub body: MessageBody,
	pub created_at: u64,
}
