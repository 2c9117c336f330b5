//! Best-effort delivery of events to connected clients.
//!
//! Events are fanned out over a single broadcast channel and filtered by
//! recipient on the receiving side. Nothing here is durable: an event
//! published while its recipient is offline is simply dropped.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// The number of undelivered events a slow subscriber may fall behind by
/// before it starts missing events.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug)]
struct Envelope<T> {
	recipient: Uuid,
	event: T,
}

/// A broadcast hub of events addressed to individual users.
#[derive(Debug)]
pub struct Hub<T> {
	sender: broadcast::Sender<Arc<Envelope<T>>>,
}

impl<T> Clone for Hub<T> {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

impl<T> Default for Hub<T>
where
	T: Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

impl<T> Hub<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);

		Self { sender }
	}

	/// Publishes an event to `recipient`, returning whether any client was
	/// listening at the time. A `false` return is not an error.
	pub fn publish(&self, recipient: Uuid, event: T) -> bool {
		self.sender
			.send(Arc::new(Envelope { recipient, event }))
			.is_ok()
	}

	/// Subscribes to events addressed to `user`.
	pub fn subscribe(&self, user: Uuid) -> Subscription<T> {
		Subscription {
			user,
			receiver: self.sender.subscribe(),
		}
	}
}

/// A stream of events for a single user.
pub struct Subscription<T> {
	user: Uuid,
	receiver: broadcast::Receiver<Arc<Envelope<T>>>,
}

impl<T> Subscription<T>
where
	T: Clone + Send + Sync + 'static,
{
	/// Waits for the next event addressed to this subscription's user.
	///
	/// Returns `None` once the hub is gone. Events missed because the
	/// subscriber lagged behind are skipped.
	pub async fn recv(&mut self) -> Option<T> {
		loop {
			match self.receiver.recv().await {
				Ok(envelope) if envelope.recipient == self.user => {
					return Some(envelope.event.clone());
				}
				Ok(..) => continue,
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(user = %self.user, skipped, "realtime subscriber lagged");
				}
				Err(RecvError::Closed) => return None,
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[tokio::test]
	async fn test_publish_without_subscribers() {
		let hub = Hub::<u32>::new(4);

		assert!(!hub.publish(Uuid::new_v4(), 1));
	}

	#[tokio::test]
	async fn test_subscription_filters_by_recipient() {
		let hub = Hub::<&'static str>::new(8);
		let alice = Uuid::new_v4();
		let bob = Uuid::new_v4();

		let mut subscription = hub.subscribe(alice);

		assert!(hub.publish(bob, "for bob"));
		assert!(hub.publish(alice, "for alice"));

		assert_eq!(subscription.recv().await, Some("for alice"));
	}

	#[tokio::test]
	async fn test_lagging_subscriber_skips_ahead() {
		let hub = Hub::<u32>::new(2);
		let user = Uuid::new_v4();
		let mut subscription = hub.subscribe(user);

		for n in 0..5 {
			hub.publish(user, n);
		}

		// the oldest events were overwritten, but the newest still arrive
		assert_eq!(subscription.recv().await, Some(3));
		assert_eq!(subscription.recv().await, Some(4));
	}

	#[tokio::test]
	async fn test_closed_hub_ends_subscription() {
		let hub = Hub::<u32>::new(2);
		let mut subscription = hub.subscribe(Uuid::new_v4());

		drop(hub);

		assert_eq!(subscription.recv().await, None);
	}
}
