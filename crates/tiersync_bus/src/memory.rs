// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tiersync_tier::Error;
use tokio::sync::broadcast;

use crate::{Delivery, InvalidationBus, Subscription};

/// An in-process [`InvalidationBus`] backed by one broadcast channel per topic.
///
/// Clones share topics, so coordinators in the same process that hold clones
/// of one bus see each other's events.
///
/// # Examples
///
/// ```
/// use tiersync_bus::MemoryBus;
///
/// let bus = MemoryBus::with_capacity(16);
/// let peer = bus.clone();
/// # let _ = peer;
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    /// Default number of payloads buffered per subscriber before it lags.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a bus with the default per-topic capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a bus buffering `capacity` payloads per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "bus capacity must be greater than zero");
        Self {
            capacity,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the number of live subscriptions to `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.lock().get(topic).map_or(0, broadcast::Sender::receiver_count)
    }

    /// Closes `topic`; its subscriptions yield `None` after draining.
    ///
    /// A later [`subscribe`](InvalidationBus::subscribe) opens the topic again.
    pub fn close_topic(&self, topic: &str) {
        self.topics.lock().remove(topic);
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl InvalidationBus for MemoryBus {
    type Subscription = MemorySubscription;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Error> {
        let sender = self.topics.lock().get(topic).cloned();
        match sender.map(|sender| sender.send(payload)) {
            Some(Ok(receivers)) => {
                tracing::trace!(bus.topic = topic, receivers, "payload published");
            }
            Some(Err(_)) | None => {
                tracing::trace!(bus.topic = topic, "payload published without subscribers");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<MemorySubscription, Error> {
        Ok(MemorySubscription {
            receiver: self.sender(topic).subscribe(),
        })
    }
}

/// A subscription to a [`MemoryBus`] topic.
#[derive(Debug)]
pub struct MemorySubscription {
    receiver: broadcast::Receiver<Vec<u8>>,
}

impl Subscription for MemorySubscription {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        match self.receiver.recv().await {
            Ok(payload) => Some(Delivery::Payload(payload)),
            Err(broadcast::error::RecvError::Lagged(missed)) => Some(Delivery::Lagged(missed)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
