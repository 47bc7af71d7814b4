// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use futures::StreamExt;
use futures::stream::BoxStream;
use redis::aio::ConnectionManager;
use tiersync_bus::{Delivery, InvalidationBus, Subscription};
use tiersync_tier::Error;

/// An [`InvalidationBus`] on Redis pub/sub.
///
/// Publishing shares the connection manager; each subscription opens its own
/// pub/sub connection from the client, since a connection in subscriber mode
/// cannot issue other commands.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    connection: ConnectionManager,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus").field("client", &self.client).finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Creates a bus publishing on `connection` and subscribing through `client`.
    #[must_use]
    pub fn new(client: redis::Client, connection: ConnectionManager) -> Self {
        Self { client, connection }
    }
}

impl InvalidationBus for RedisBus {
    type Subscription = RedisSubscription;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Error> {
        let mut connection = self.connection.clone();
        let receivers: u64 = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async(&mut connection)
            .await
            .map_err(Error::provider)?;
        tracing::trace!(bus.topic = topic, receivers, "payload published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<RedisSubscription, Error> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(Error::provider)?;
        pubsub.subscribe(topic).await.map_err(Error::provider)?;
        tracing::debug!(bus.topic = topic, "subscribed");

        Ok(RedisSubscription {
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

/// A subscription to one Redis channel.
///
/// Ends when the pub/sub connection drops; subscribe again to resume.
pub struct RedisSubscription {
    messages: BoxStream<'static, redis::Msg>,
}

impl fmt::Debug for RedisSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSubscription").finish_non_exhaustive()
    }
}

impl Subscription for RedisSubscription {
    async fn next_delivery(&mut self) -> Option<Delivery> {
        let message = self.messages.next().await?;
        Some(Delivery::Payload(message.get_payload_bytes().to_vec()))
    }
}
