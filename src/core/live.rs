//! Change feed for live admin views.
//!
//! A [`ChangeHub`] fans every published change out to its current subscribers.
//! Each subscriber receives changes in publication order through its own
//! channel. Dropping a [`Subscription`] unregisters it, so a torn-down view
//! stops receiving changes immediately.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{OwnedMutexGuard, mpsc};
use tracing::trace;

struct HubInner<E> {
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<E>)>,
}

/// Publish/subscribe hub for change notifications
pub struct ChangeHub<E> {
    inner: Arc<Mutex<HubInner<E>>>,
    writes: Arc<tokio::sync::Mutex<()>>,
}

impl<E> Clone for ChangeHub<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            writes: Arc::clone(&self.writes),
        }
    }
}

impl<E> Default for ChangeHub<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
            writes: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl<E: Clone> ChangeHub<E> {
    /// A hub with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. It only sees changes published after this call.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<E> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, sender));
        trace!(subscriber = id, "Subscribed to change hub");

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Serializes writers of this hub.
    ///
    /// A writer holds the guard across its store write and the matching
    /// [`publish`](Self::publish), so subscribers see changes in commit order.
    pub async fn lock_writes(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.writes).lock_owned().await
    }

    /// Delivers `change` to every subscriber and returns how many received it.
    pub fn publish(&self, change: E) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .subscribers
            .retain(|(_, sender)| sender.send(change.clone()).is_ok());
        inner.subscribers.len()
    }

    /// Subscribers still registered
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

/// Receiving end of a hub registration
pub struct Subscription<E> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<E>,
    hub: Weak<Mutex<HubInner<E>>>,
}

impl<E> Subscription<E> {
    /// Waits for the next change. Returns `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Next change if one is already queued.
    pub fn try_next(&mut self) -> Option<E> {
        self.receiver.try_recv().ok()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut inner = hub.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.retain(|(id, _)| *id != self.id);
            trace!(subscriber = self.id, "Unsubscribed from change hub");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_arrive_in_order() {
        let hub = ChangeHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.publish(1), 2);
        assert_eq!(hub.publish(2), 2);

        assert_eq!(first.try_next(), Some(1));
        assert_eq!(first.try_next(), Some(2));
        assert_eq!(second.try_next(), Some(1));
        assert_eq!(second.try_next(), Some(2));
        assert_eq!(second.try_next(), None);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_changes() {
        let hub = ChangeHub::new();
        hub.publish("before");
        let mut late = hub.subscribe();
        hub.publish("after");
        assert_eq!(late.try_next(), Some("after"));
        assert_eq!(late.try_next(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub: ChangeHub<u8> = ChangeHub::new();
        let kept = hub.subscribe();
        let dropped = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(dropped);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.publish(7), 1);
        drop(kept);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_writers_wait_for_each_other() {
        let hub: ChangeHub<u8> = ChangeHub::new();
        let clone = hub.clone();

        let held = hub.lock_writes().await;
        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(20), clone.lock_writes()).await;
        assert!(blocked.is_err());

        drop(held);
        let acquired =
            tokio::time::timeout(std::time::Duration::from_millis(200), clone.lock_writes()).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_next_ends_when_hub_is_gone() {
        let hub: ChangeHub<u8> = ChangeHub::new();
        let mut subscription = hub.subscribe();
        hub.publish(3);
        drop(hub);

        assert_eq!(subscription.next().await, Some(3));
        assert_eq!(subscription.next().await, None);
    }
}
