// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Background tasks applying invalidation events to the local tier.

use tiersync_bus::{Delivery, InvalidationBus, InvalidationEvent, Subscription};
use tiersync_lock::LockProvider;
use tiersync_tier::{CacheTier, Error};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::Coordinator;
use crate::options::ListenerOptions;
use crate::telemetry::{CacheActivity, CacheOperation};

#[derive(Debug)]
enum Command {
    Evict(InvalidationEvent),
    EvictAll,
}

/// Subscribes a coordinator to its invalidation topic.
///
/// Two tasks run once started. The subscription task decodes payloads and
/// forwards them over a channel; the eviction task applies them through
/// [`Coordinator::evict_local`]. Malformed payloads are logged and dropped.
///
/// When the subscription ends, the listener resubscribes with exponential
/// backoff. After resubscribing, or when the bus reports that payloads were
/// dropped, the whole local tier is cleared because events may have been
/// missed.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use tiersync::{Coordinator, InMemoryTier, InvalidationListener};
/// use tiersync_bus::MemoryBus;
/// use tiersync_lock::MemoryLockProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tiersync::Result<()> {
/// let clock = Clock::new_tokio();
/// let coordinator = Coordinator::builder::<String>(clock.clone())
///     .local(InMemoryTier::new())
///     .shared(InMemoryTier::new())
///     .locks(MemoryLockProvider::new(clock))
///     .bus(MemoryBus::new())
///     .build();
///
/// let listener = InvalidationListener::new(coordinator).start().await?;
/// listener.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InvalidationListener<V, L, S, K, B> {
    coordinator: Coordinator<V, L, S, K, B>,
    options: ListenerOptions,
}

impl<V, L, S, K, B> InvalidationListener<V, L, S, K, B>
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V> + 'static,
    S: CacheTier<V> + 'static,
    K: LockProvider + 'static,
    B: InvalidationBus + 'static,
{
    /// Creates a listener for `coordinator` with default options.
    #[must_use]
    pub fn new(coordinator: Coordinator<V, L, S, K, B>) -> Self {
        Self {
            coordinator,
            options: ListenerOptions::default(),
        }
    }

    /// Sets the resubscription backoff.
    #[must_use]
    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    /// Subscribes and spawns the listener tasks on the current tokio runtime.
    ///
    /// Events published after this returns are guaranteed to be seen.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the initial subscription fails.
    pub async fn start(self) -> Result<ListenerHandle, Error> {
        let topic = self.coordinator.options().topic.clone();
        let subscription = self.coordinator.bus().subscribe(&topic).await?;
        self.coordinator
            .telemetry()
            .record(CacheOperation::Listen, CacheActivity::Subscribed, None, None);

        let (sender, receiver) = mpsc::unbounded_channel();
        let eviction = tokio::spawn(run_evictions(self.coordinator.clone(), receiver));
        let subscription = tokio::spawn(run_subscription(self.coordinator, self.options, subscription, sender));

        Ok(ListenerHandle { subscription, eviction })
    }
}

/// Controls running listener tasks.
///
/// Dropping the handle stops the tasks.
#[derive(Debug)]
pub struct ListenerHandle {
    subscription: JoinHandle<()>,
    eviction: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stops both listener tasks.
    pub fn shutdown(self) {
        drop(self);
    }

    /// Returns `true` once both tasks have stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.subscription.is_finished() && self.eviction.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.subscription.abort();
        self.eviction.abort();
    }
}

async fn run_subscription<V, L, S, K, B>(
    coordinator: Coordinator<V, L, S, K, B>,
    options: ListenerOptions,
    mut subscription: B::Subscription,
    sender: mpsc::UnboundedSender<Command>,
) where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V>,
    S: CacheTier<V>,
    K: LockProvider,
    B: InvalidationBus,
{
    let telemetry = coordinator.telemetry();

    loop {
        while let Some(delivery) = subscription.next_delivery().await {
            let command = match delivery {
                Delivery::Payload(payload) => match InvalidationEvent::decode(&payload) {
                    Ok(event) => Command::Evict(event),
                    Err(error) => {
                        telemetry.record_failure(CacheOperation::Listen, CacheActivity::DecodeFailed, None, &error);
                        continue;
                    }
                },
                Delivery::Lagged(missed) => {
                    tracing::warn!(tiersync.node = telemetry.node(), missed, "invalidation events dropped by the bus");
                    telemetry.record(CacheOperation::Listen, CacheActivity::Lagged, None, None);
                    Command::EvictAll
                }
            };

            if sender.send(command).is_err() {
                return;
            }
        }

        subscription = resubscribe(&coordinator, &options).await;
        if sender.send(Command::EvictAll).is_err() {
            return;
        }
    }
}

async fn resubscribe<V, L, S, K, B>(coordinator: &Coordinator<V, L, S, K, B>, options: &ListenerOptions) -> B::Subscription
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V>,
    S: CacheTier<V>,
    K: LockProvider,
    B: InvalidationBus,
{
    let telemetry = coordinator.telemetry();
    let topic = &coordinator.options().topic;
    let mut backoff = options.first_backoff();

    loop {
        coordinator.clock().delay(backoff).await;

        match coordinator.bus().subscribe(topic).await {
            Ok(subscription) => {
                telemetry.record(CacheOperation::Listen, CacheActivity::Subscribed, None, None);
                return subscription;
            }
            Err(error) => {
                tracing::warn!(
                    tiersync.node = telemetry.node(),
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "resubscription failed, retrying"
                );
                telemetry.record_error(CacheOperation::Listen, None, &error);
                backoff = options.next_backoff(backoff);
            }
        }
    }
}

async fn run_evictions<V, L, S, K, B>(coordinator: Coordinator<V, L, S, K, B>, mut receiver: mpsc::UnboundedReceiver<Command>)
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V>,
    S: CacheTier<V>,
    K: LockProvider,
    B: InvalidationBus,
{
    while let Some(command) = receiver.recv().await {
        // Failures are logged by the coordinator.
        let _ = match command {
            Command::Evict(event) => coordinator.evict_local(event.key()).await,
            Command::EvictAll => coordinator.evict_all_local().await,
        };
    }
}
