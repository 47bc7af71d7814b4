// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use tiersync_tier::Error;

/// Topic invalidation events are published on unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "cache:update:topic";

/// One item received from a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A published payload.
    Payload(Vec<u8>),
    /// The subscriber fell behind and this many payloads were dropped.
    Lagged(u64),
}

/// A topic-based publish/subscribe channel carrying raw payloads.
pub trait InvalidationBus: Send + Sync {
    /// The stream of deliveries returned by [`subscribe`](Self::subscribe).
    type Subscription: Subscription;

    /// Publishes `payload` to every current subscriber of `topic`.
    ///
    /// Publishing to a topic nobody listens on succeeds.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the transport could not be reached.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Subscribes to `topic`.
    ///
    /// Only payloads published after the subscription is established are
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the transport could not be reached.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<Self::Subscription, Error>> + Send;
}

/// A live subscription to one topic.
pub trait Subscription: Send + 'static {
    /// Waits for the next delivery.
    ///
    /// Returns `None` once the subscription is closed; it will not yield
    /// anything further.
    fn next_delivery(&mut self) -> impl Future<Output = Option<Delivery>> + Send;
}

impl<T> InvalidationBus for Arc<T>
where
    T: InvalidationBus,
{
    type Subscription = T::Subscription;

    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).publish(topic, payload)
    }

    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<Self::Subscription, Error>> + Send {
        (**self).subscribe(topic)
    }
}
