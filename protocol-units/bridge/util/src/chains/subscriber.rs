use crate::events::EventVariant;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type Subscribers = Vec<(Uuid, mpsc::Sender<EventVariant>)>;

/// Receiving end handed to the dispatcher.
#[derive(Debug)]
pub struct EventSubscriber {
	id: Uuid,
	receiver: mpsc::Receiver<EventVariant>,
}

impl EventSubscriber {
	pub fn id(&self) -> Uuid {
		self.id
	}

	/// `None` once the publisher dropped the sender.
	pub async fn recv(&mut self) -> Option<EventVariant> {
		self.receiver.recv().await
	}
}

/// Fan-out of connector events to bounded subscriber channels.
#[derive(Debug, Clone)]
pub struct EventPublisher {
	capacity: usize,
	subscribers: Arc<Mutex<Subscribers>>,
}

impl EventPublisher {
	pub fn new(capacity: usize) -> Self {
		EventPublisher { capacity: capacity.max(1), subscribers: Arc::new(Mutex::new(Vec::new())) }
	}

	fn lock(&self) -> MutexGuard<'_, Subscribers> {
		self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn subscribe(&self) -> EventSubscriber {
		let (sender, receiver) = mpsc::channel(self.capacity);
		let id = Uuid::new_v4();
		self.lock().push((id, sender));
		EventSubscriber { id, receiver }
	}

	/// Drops the sender so the subscriber's channel closes.
	pub fn unsubscribe(&self, id: Uuid) {
		self.lock().retain(|(subscriber_id, _)| *subscriber_id != id);
	}

	pub fn subscriber_count(&self) -> usize {
		self.lock().len()
	}

	/// Delivers `event` to every subscriber, waiting for channel capacity.
	/// The event is dropped for a subscriber only when `shutdown` is cancelled.
	pub async fn notify(&self, event: EventVariant, shutdown: &CancellationToken) {
		let senders: Vec<_> = self.lock().iter().map(|(id, s)| (*id, s.clone())).collect();
		for (id, sender) in senders {
			tokio::select! {
				biased;
				_ = shutdown.cancelled() => {
					tracing::debug!(subscriber = %id, "Shutdown requested, event dropped: {event}");
				}
				res = sender.send(event.clone()) => {
					if res.is_err() {
						tracing::debug!(subscriber = %id, "Subscriber channel closed");
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::events::{FundsOut, TransactionInfo};
	use crate::networks::NetworkAddress;
	use std::time::Duration;

	fn event(block: u64) -> EventVariant {
		EventVariant::FundsOut(FundsOut {
			from: NetworkAddress::new("GOERLI", "0x01"),
			to: vec![2],
			amount: "10".to_string(),
			token: vec![3],
			tx: TransactionInfo { hash: vec![block as u8], block_number: block, sender: vec![] },
		})
	}

	#[tokio::test]
	async fn every_subscriber_receives_in_order() {
		let publisher = EventPublisher::new(4);
		let mut first = publisher.subscribe();
		let mut second = publisher.subscribe();
		let shutdown = CancellationToken::new();

		publisher.notify(event(1), &shutdown).await;
		publisher.notify(event(2), &shutdown).await;

		for sub in [&mut first, &mut second] {
			assert_eq!(sub.recv().await.unwrap().block_number(), 1);
			assert_eq!(sub.recv().await.unwrap().block_number(), 2);
		}
	}

	#[tokio::test]
	async fn full_channel_blocks_instead_of_dropping() {
		let publisher = EventPublisher::new(1);
		let mut sub = publisher.subscribe();
		let shutdown = CancellationToken::new();

		publisher.notify(event(1), &shutdown).await;
		let blocked = tokio::time::timeout(
			Duration::from_millis(50),
			publisher.notify(event(2), &shutdown),
		)
		.await;
		assert!(blocked.is_err());

		let producer = {
			let publisher = publisher.clone();
			let shutdown = shutdown.clone();
			tokio::spawn(async move { publisher.notify(event(3), &shutdown).await })
		};
		assert_eq!(sub.recv().await.unwrap().block_number(), 1);
		assert_eq!(sub.recv().await.unwrap().block_number(), 3);
		producer.await.unwrap();
	}

	#[tokio::test]
	async fn shutdown_releases_blocked_notify() {
		let publisher = EventPublisher::new(1);
		let _sub = publisher.subscribe();
		let shutdown = CancellationToken::new();

		publisher.notify(event(1), &shutdown).await;
		shutdown.cancel();
		tokio::time::timeout(Duration::from_secs(1), publisher.notify(event(2), &shutdown))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn unsubscribe_closes_the_channel() {
		let publisher = EventPublisher::new(2);
		let mut sub = publisher.subscribe();
		publisher.unsubscribe(sub.id());
		assert_eq!(publisher.subscriber_count(), 0);
		assert!(sub.recv().await.is_none());
	}
}
