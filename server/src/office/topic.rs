use tokio::sync::broadcast;

const TOPIC_CHANNEL_CAPACITY: usize = 128;

/// A typed publish/subscribe channel for one class of in-process events.
///
/// Subscriptions are scoped to the subscriber: dropping the receiver is the
/// whole teardown. Publishing never blocks the dispatcher; a subscriber that
/// falls behind observes a lag error on its own receiver instead.
#[derive(Debug)]
pub struct Topic<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Topic<T> {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOPIC_CHANNEL_CAPACITY);

        Topic { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Publish to all current subscribers. A topic without subscribers
    /// swallows the item.
    pub fn publish(&self, item: T) {
        let _ = self.tx.send(item);
    }
}

impl<T: Clone> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}
