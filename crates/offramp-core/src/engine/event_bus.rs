//! Broadcast channel for payment events.

use offramp_types::PaymentEvent;
use tokio::sync::broadcast;

/// Fan-out of [`PaymentEvent`]s to any number of subscribers.
///
/// Publishing never blocks; slow subscribers lag and miss events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<PaymentEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
		self.sender.subscribe()
	}

	/// Errors only when nobody is subscribed.
	pub fn publish(
		&self,
		event: PaymentEvent,
	) -> Result<usize, broadcast::error::SendError<PaymentEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use offramp_types::AttemptId;

	#[tokio::test]
	async fn test_subscribers_receive_events() {
		let bus = EventBus::new(8);
		let mut rx = bus.subscribe();

		bus.publish(PaymentEvent::Failed {
			attempt: AttemptId::new(1),
			message: "boom".to_string(),
		})
		.unwrap();

		let event = rx.recv().await.unwrap();
		assert_eq!(event.attempt(), Some(AttemptId::new(1)));
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(PaymentEvent::InsufficientFunds {
				requested: "100".to_string(),
				available: "50".to_string(),
			})
			.is_err());
	}
}
