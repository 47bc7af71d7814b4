// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tiersync_bus::InvalidationBus;
use tiersync_lock::LockProvider;
use tiersync_tier::{CacheTier, Error};

use crate::coordinator::Coordinator;
use crate::listener::{InvalidationListener, ListenerHandle};
use crate::options::ListenerOptions;

/// A coordinator together with its running invalidation listener.
///
/// This is what a server instance holds for its lifetime: build the
/// providers, build the coordinator, then start the node. Dropping the node
/// stops the listener.
#[derive(Debug)]
pub struct CacheNode<V, L, S, K, B> {
    coordinator: Coordinator<V, L, S, K, B>,
    listener: ListenerHandle,
}

impl<V, L, S, K, B> CacheNode<V, L, S, K, B>
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V> + 'static,
    S: CacheTier<V> + 'static,
    K: LockProvider + 'static,
    B: InvalidationBus + 'static,
{
    /// Starts listening for invalidations and returns the running node.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the initial subscription fails.
    pub async fn start(coordinator: Coordinator<V, L, S, K, B>, options: ListenerOptions) -> Result<Self, Error> {
        let listener = InvalidationListener::new(coordinator.clone()).with_options(options).start().await?;
        Ok(Self { coordinator, listener })
    }

    /// The node's coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator<V, L, S, K, B> {
        &self.coordinator
    }

    /// Stops the listener and hands back the coordinator.
    #[must_use]
    pub fn shutdown(self) -> Coordinator<V, L, S, K, B> {
        self.listener.shutdown();
        self.coordinator
    }
}
