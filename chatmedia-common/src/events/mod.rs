//! Failure broadcast channel
//!
//! Lets a playback/display controller ask the resolution that owns it to move
//! on to the next candidate without either side holding a reference to the
//! other's internals.

mod failure_types;

pub use failure_types::{FailureEvent, FailureKind};

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publish/subscribe channel for failure events
///
/// Uses tokio::broadcast internally. Each subscriber owns its own receiver,
/// so dropping a [`Subscription`] takes effect immediately: nothing published
/// afterwards is delivered to it, and anything still buffered for it is
/// discarded with the receiver.
///
/// # Examples
///
/// ```
/// use chatmedia_common::events::{FailureChannel, FailureEvent, FailureKind};
///
/// let channel = FailureChannel::new(16);
/// let mut sub = channel.subscribe("42");
///
/// channel.publish_lossy(FailureEvent::new(
///     "42",
///     "https://chat.example.com/api/media/42",
///     1,
///     FailureKind::LoadError,
///     uuid::Uuid::new_v4(),
/// ));
///
/// assert_eq!(sub.try_next().map(|e| e.retry_count), Some(1));
/// ```
#[derive(Debug)]
pub struct FailureChannel {
    tx: broadcast::Sender<FailureEvent>,
    capacity: usize,
}

impl FailureChannel {
    /// Creates a channel buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to future events for one message
    ///
    /// Events published before this call are not received.
    pub fn subscribe(&self, message_id: impl Into<String>) -> Subscription {
        let message_id = message_id.into();
        debug!(message_id = %message_id, "Failure channel subscription opened");
        Subscription {
            message_id,
            rx: self.tx.subscribe(),
        }
    }

    /// Publish an event to every live subscriber
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn publish(
        &self,
        event: FailureEvent,
    ) -> Result<usize, broadcast::error::SendError<FailureEvent>> {
        self.tx.send(event)
    }

    /// Publish an event, ignoring if nobody is listening
    pub fn publish_lossy(&self, event: FailureEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(locator = %e.0.failed_locator, "Failure event dropped: no subscribers");
        }
    }

    /// Current number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One subscriber's view of a [`FailureChannel`], filtered by message id
#[derive(Debug)]
pub struct Subscription {
    message_id: String,
    rx: broadcast::Receiver<FailureEvent>,
}

impl Subscription {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Next pending event for this message, without waiting
    pub fn try_next(&mut self) -> Option<FailureEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.message_id == self.message_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(
                        message_id = %self.message_id,
                        skipped,
                        "Failure subscription lagged, oldest events dropped"
                    );
                    continue;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }

    /// All pending events for this message, in delivery order
    pub fn drain(&mut self) -> Vec<FailureEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event for this message
    ///
    /// Returns `None` once the channel has been dropped.
    pub async fn next(&mut self) -> Option<FailureEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.message_id == self.message_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        message_id = %self.message_id,
                        skipped,
                        "Failure subscription lagged, oldest events dropped"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving; equivalent to dropping the subscription
    pub fn unsubscribe(self) {
        debug!(message_id = %self.message_id, "Failure channel subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event(message_id: &str, locator: &str, retry_count: u32) -> FailureEvent {
        FailureEvent::new(message_id, locator, retry_count, FailureKind::LoadError, Uuid::new_v4())
    }

    #[test]
    fn test_channel_new() {
        let channel = FailureChannel::new(8);
        assert_eq!(channel.capacity(), 8);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let channel = FailureChannel::new(0);
        assert_eq!(channel.capacity(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_err() {
        let channel = FailureChannel::new(8);
        assert!(channel.publish(event("1", "a", 0)).is_err());
        channel.publish_lossy(event("1", "a", 0));
    }

    #[test]
    fn test_subscription_filters_by_message() {
        let channel = FailureChannel::new(8);
        let mut sub_a = channel.subscribe("a");
        let mut sub_b = channel.subscribe("b");

        channel.publish(event("a", "loc-a", 1)).expect("publish should succeed");
        channel.publish(event("b", "loc-b", 2)).expect("publish should succeed");

        let a = sub_a.drain();
        let b = sub_b.drain();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].failed_locator, "loc-a");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].failed_locator, "loc-b");
    }

    #[test]
    fn test_delivery_order_preserved() {
        let channel = FailureChannel::new(8);
        let mut sub = channel.subscribe("m");
        for i in 0..3 {
            channel.publish_lossy(event("m", "loc", i));
        }
        let counts: Vec<u32> = sub.drain().iter().map(|e| e.retry_count).collect();
        assert_eq!(counts, vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_takes_effect_before_next_publish() {
        let channel = FailureChannel::new(8);
        let sub = channel.subscribe("m");
        let mut other = channel.subscribe("m");
        assert_eq!(channel.subscriber_count(), 2);

        sub.unsubscribe();
        assert_eq!(channel.subscriber_count(), 1);

        let delivered = channel.publish(event("m", "loc", 0)).expect("publish should succeed");
        assert_eq!(delivered, 1);
        assert!(other.try_next().is_some());
    }

    #[test]
    fn test_new_subscription_misses_earlier_events() {
        let channel = FailureChannel::new(8);
        let _keep = channel.subscribe("m");
        channel.publish_lossy(event("m", "old", 0));

        let mut late = channel.subscribe("m");
        assert!(late.try_next().is_none());
    }

    #[test]
    fn test_lagged_subscription_recovers() {
        let channel = FailureChannel::new(2);
        let mut sub = channel.subscribe("m");
        for i in 0..5 {
            channel.publish_lossy(event("m", "loc", i));
        }
        let counts: Vec<u32> = sub.drain().iter().map(|e| e.retry_count).collect();
        assert_eq!(counts, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_async_next_receives_event() {
        let channel = FailureChannel::new(8);
        let mut sub = channel.subscribe("m");
        channel.publish_lossy(event("other", "x", 0));
        channel.publish_lossy(event("m", "loc", 3));

        let received = sub.next().await.expect("should receive event");
        assert_eq!(received.failed_locator, "loc");
        assert_eq!(received.retry_count, 3);
    }

    #[tokio::test]
    async fn test_async_next_none_after_channel_dropped() {
        let channel = FailureChannel::new(8);
        let mut sub = channel.subscribe("m");
        drop(channel);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&event("m", "loc", 1)).expect("serialize");
        assert!(json.contains("\"kind\":\"LoadError\""));
        let back: FailureEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.kind, FailureKind::LoadError);
    }
}
