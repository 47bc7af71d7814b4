// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder wiring providers into a [`Coordinator`].

use std::marker::PhantomData;

use tick::Clock;
use tiersync_bus::InvalidationBus;
use tiersync_lock::{LockProvider, LockSettings};
use tiersync_tier::CacheTier;

use crate::coordinator::Coordinator;
use crate::options::{CoordinatorOptions, LockTimeoutPolicy};

/// Builder for a [`Coordinator`].
///
/// Created by [`Coordinator::builder`]. The four providers are set with
/// [`local`](Self::local), [`shared`](Self::shared), [`locks`](Self::locks)
/// and [`bus`](Self::bus); [`build`](Self::build) is available once all four
/// are in place.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use tiersync::{Coordinator, InMemoryTier, LockTimeoutPolicy};
/// use tiersync_bus::MemoryBus;
/// use tiersync_lock::{LockSettings, MemoryLockProvider};
///
/// let clock = Clock::new_frozen();
/// let coordinator = Coordinator::builder::<u64>(clock.clone())
///     .local(InMemoryTier::with_capacity(100))
///     .shared(InMemoryTier::new())
///     .locks(MemoryLockProvider::new(clock))
///     .bus(MemoryBus::new())
///     .name("orders-node-1")
///     .topic("orders:invalidate")
///     .lock_settings(LockSettings::default().wait(Duration::from_secs(1)))
///     .lock_timeout_policy(LockTimeoutPolicy::Fail)
///     .build();
///
/// assert_eq!(coordinator.name(), "orders-node-1");
/// ```
#[derive(Debug)]
pub struct CoordinatorBuilder<V, L = (), S = (), K = (), B = ()> {
    clock: Clock,
    local: L,
    shared: S,
    locks: K,
    bus: B,
    options: CoordinatorOptions,
    _value: PhantomData<fn() -> V>,
}

impl<V> CoordinatorBuilder<V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            local: (),
            shared: (),
            locks: (),
            bus: (),
            options: CoordinatorOptions::default(),
            _value: PhantomData,
        }
    }
}

impl<V, L, S, K, B> CoordinatorBuilder<V, L, S, K, B> {
    /// Sets the in-process tier.
    #[must_use]
    pub fn local<T>(self, local: T) -> CoordinatorBuilder<V, T, S, K, B>
    where
        T: CacheTier<V>,
    {
        CoordinatorBuilder {
            clock: self.clock,
            local,
            shared: self.shared,
            locks: self.locks,
            bus: self.bus,
            options: self.options,
            _value: PhantomData,
        }
    }

    /// Sets the tier shared by every node.
    #[must_use]
    pub fn shared<T>(self, shared: T) -> CoordinatorBuilder<V, L, T, K, B>
    where
        T: CacheTier<V>,
    {
        CoordinatorBuilder {
            clock: self.clock,
            local: self.local,
            shared,
            locks: self.locks,
            bus: self.bus,
            options: self.options,
            _value: PhantomData,
        }
    }

    /// Sets the provider of per-key write locks.
    #[must_use]
    pub fn locks<T>(self, locks: T) -> CoordinatorBuilder<V, L, S, T, B>
    where
        T: LockProvider,
    {
        CoordinatorBuilder {
            clock: self.clock,
            local: self.local,
            shared: self.shared,
            locks,
            bus: self.bus,
            options: self.options,
            _value: PhantomData,
        }
    }

    /// Sets the bus carrying invalidation events.
    #[must_use]
    pub fn bus<T>(self, bus: T) -> CoordinatorBuilder<V, L, S, K, T>
    where
        T: InvalidationBus,
    {
        CoordinatorBuilder {
            clock: self.clock,
            local: self.local,
            shared: self.shared,
            locks: self.locks,
            bus,
            options: self.options,
            _value: PhantomData,
        }
    }

    /// Replaces all options at once.
    #[must_use]
    pub fn options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the node name used in logs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// Sets the invalidation topic.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.options.topic = topic.into();
        self
    }

    /// Sets lock naming, wait and lease.
    #[must_use]
    pub fn lock_settings(mut self, settings: LockSettings) -> Self {
        self.options.lock = settings;
        self
    }

    /// Sets what writes do when the lock wait elapses.
    #[must_use]
    pub fn lock_timeout_policy(mut self, policy: LockTimeoutPolicy) -> Self {
        self.options.lock_timeout_policy = policy;
        self
    }
}

impl<V, L, S, K, B> CoordinatorBuilder<V, L, S, K, B>
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V>,
    S: CacheTier<V>,
    K: LockProvider,
    B: InvalidationBus,
{
    /// Builds the coordinator.
    #[must_use]
    pub fn build(self) -> Coordinator<V, L, S, K, B> {
        Coordinator::new(self.local, self.shared, self.locks, self.bus, self.options, self.clock)
    }
}
