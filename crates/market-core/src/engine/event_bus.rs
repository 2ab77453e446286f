//! Broadcast channel carrying marketplace events.
//!
//! Handlers publish after each persisted state change. Publishing with no
//! subscribers is not an error for callers; they discard the result.

use market_types::MarketEvent;
use tokio::sync::broadcast;

/// Event bus for in-process fan-out of [`MarketEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, returning the number of subscribers that received it.
	pub fn publish(
		&self,
		event: MarketEvent,
	) -> Result<usize, broadcast::error::SendError<MarketEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::OrderFormEvent;

	#[tokio::test]
	async fn test_publish_reaches_subscribers() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();

		let delivered = bus
			.publish(MarketEvent::OrderForm(OrderFormEvent::Accepted {
				form_id: "f1".into(),
			}))
			.unwrap();
		assert_eq!(delivered, 1);

		match rx.recv().await.unwrap() {
			MarketEvent::OrderForm(OrderFormEvent::Accepted { form_id }) => {
				assert_eq!(form_id, "f1")
			},
			other => panic!("unexpected event {:?}", other),
		}
	}

	#[test]
	fn test_publish_without_subscribers_errors() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(MarketEvent::OrderForm(OrderFormEvent::Rejected {
				form_id: "f1".into(),
			}))
			.is_err());
	}
}
