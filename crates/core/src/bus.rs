//! Typed broadcast streams.
//!
//! The session exposes two of these: one carrying normalized events and one
//! carrying classified errors. A broadcast channel distributes every item to
//! all subscribers; a slow subscriber may lag and skip items but never blocks
//! the publisher.

use std::fmt::Debug;
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity for a bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// A typed broadcast stream.
#[derive(Clone)]
pub struct Bus<T: Clone> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Debug + Send + 'static> Bus<T> {
    /// Create a new bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the specified capacity.
    ///
    /// The capacity determines how many items are buffered for slow
    /// subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an item to all subscribers.
    ///
    /// If there are no subscribers the item is discarded. Returns `true`
    /// if at least one subscriber received it.
    pub fn publish(&self, item: T) -> bool {
        self.tx.send(item).is_ok()
    }

    /// Subscribe to all items published after this call.
    pub fn subscribe(&self) -> BusReceiver<T> {
        BusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Debug + Send + 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver half of a [`Bus`].
pub struct BusReceiver<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone + Debug + Send + 'static> BusReceiver<T> {
    /// Receive the next item.
    ///
    /// Returns `None` once the bus is closed. A lagged receiver skips the
    /// missed items and keeps going.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("bus receiver lagged, skipped {} items", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive without waiting. Returns `None` when nothing is buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(item) => return Some(item),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("bus receiver lagged, skipped {} items", missed);
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let bus: Bus<String> = Bus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert!(bus.publish("hello".to_string()));
        assert_eq!(a.recv().await.as_deref(), Some("hello"));
        assert_eq!(b.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_discarded() {
        let bus: Bus<u32> = Bus::new();
        assert!(!bus.publish(7));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
