// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The read/write protocol over the local and shared tiers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tick::Clock;
use tiersync_bus::{InvalidationBus, InvalidationEvent};
use tiersync_lock::{LockProvider, with_lock};
use tiersync_tier::{CacheKey, CacheTier, Error};

use crate::builder::CoordinatorBuilder;
use crate::epoch::EvictionEpochs;
use crate::options::{CoordinatorOptions, LockTimeoutPolicy};
use crate::telemetry::{CacheActivity, CacheOperation, Telemetry};

/// Keeps one node's local tier consistent with the shared tier and the fleet.
///
/// Reads go local first, then shared, backfilling the local tier on a shared
/// hit. Writes take a per-key lock, change the shared tier, evict the local
/// copy and publish an [`InvalidationEvent`] so every other node evicts too.
///
/// Cloning is cheap; clones share providers and state.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use tiersync::{Coordinator, InMemoryTier};
/// use tiersync_bus::MemoryBus;
/// use tiersync_lock::MemoryLockProvider;
/// use tiersync_tier::CacheKey;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tiersync::Result<()> {
/// let clock = Clock::new_tokio();
/// let coordinator = Coordinator::builder::<String>(clock.clone())
///     .local(InMemoryTier::with_capacity(1_000))
///     .shared(InMemoryTier::new())
///     .locks(MemoryLockProvider::new(clock))
///     .bus(MemoryBus::new())
///     .build();
///
/// let key = CacheKey::namespaced("user", 1);
/// coordinator.update(&key, "v1".to_string()).await?;
/// assert_eq!(coordinator.get(&key).await?, Some("v1".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct Coordinator<V, L = (), S = (), K = (), B = ()> {
    inner: Arc<Inner<V, L, S, K, B>>,
}

struct Inner<V, L, S, K, B> {
    local: L,
    shared: S,
    locks: K,
    bus: B,
    options: CoordinatorOptions,
    telemetry: Telemetry,
    epochs: EvictionEpochs,
    _value: PhantomData<fn() -> V>,
}

enum Write<V> {
    Update(V),
    Delete,
}

impl<V> Write<V> {
    fn operation(&self) -> CacheOperation {
        match self {
            Self::Update(_) => CacheOperation::Update,
            Self::Delete => CacheOperation::Delete,
        }
    }
}

impl<V, L, S, K, B> Clone for Coordinator<V, L, S, K, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, L, S, K, B> fmt::Debug for Coordinator<V, L, S, K, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl Coordinator<(), (), (), (), ()> {
    /// Starts building a coordinator for values of type `V`.
    ///
    /// `clock` times operations and drives lock waits.
    #[must_use]
    pub fn builder<V>(clock: Clock) -> CoordinatorBuilder<V> {
        CoordinatorBuilder::new(clock)
    }
}

impl<V, L, S, K, B> Coordinator<V, L, S, K, B>
where
    V: Clone + Send + Sync + 'static,
    L: CacheTier<V>,
    S: CacheTier<V>,
    K: LockProvider,
    B: InvalidationBus,
{
    pub(crate) fn new(local: L, shared: S, locks: K, bus: B, options: CoordinatorOptions, clock: Clock) -> Self {
        let telemetry = Telemetry::new(&options.name, clock);
        Self {
            inner: Arc::new(Inner {
                local,
                shared,
                locks,
                bus,
                options,
                telemetry,
                epochs: EvictionEpochs::new(),
                _value: PhantomData,
            }),
        }
    }

    /// Returns the value for `key`, or `None` if neither tier holds it.
    ///
    /// The local tier answers first without locking. A local miss or local
    /// failure falls through to the shared tier; a shared hit is copied into
    /// the local tier unless an eviction for the key happened meanwhile. Reads
    /// never publish.
    ///
    /// # Errors
    ///
    /// Returns a provider error only when the shared tier fails. Local-tier
    /// and backfill failures are logged.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
        let inner = &*self.inner;
        let stopwatch = inner.telemetry.clock().stopwatch();

        match inner.local.get(key).await {
            Ok(Some(value)) => {
                inner
                    .telemetry
                    .record(CacheOperation::Get, CacheActivity::LocalHit, Some(key), Some(stopwatch.elapsed()));
                return Ok(Some(value));
            }
            Ok(None) => {}
            Err(error) => inner.telemetry.record_error(CacheOperation::Get, Some(key), &error),
        }

        let epoch = inner.epochs.current(key);
        let value = match inner.shared.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                inner
                    .telemetry
                    .record(CacheOperation::Get, CacheActivity::Miss, Some(key), Some(stopwatch.elapsed()));
                return Ok(None);
            }
            Err(error) => {
                inner.telemetry.record_error(CacheOperation::Get, Some(key), &error);
                return Err(error);
            }
        };

        inner
            .telemetry
            .record(CacheOperation::Get, CacheActivity::SharedHit, Some(key), Some(stopwatch.elapsed()));
        self.backfill(key, value.clone(), epoch).await;
        Ok(Some(value))
    }

    /// Writes `value` to the shared tier and invalidates `key` fleet-wide.
    ///
    /// Runs under the key's lock: write the shared tier, evict the local copy,
    /// publish an update event. The lock is released on every path.
    ///
    /// # Errors
    ///
    /// Returns a lock-timeout error if the lock was not acquired within the
    /// wait and the policy is [`LockTimeoutPolicy::Fail`]; nothing was written.
    /// Returns a provider error if the shared tier or the bus failed. A
    /// publish failure leaves the shared write in place.
    pub async fn update(&self, key: &CacheKey, value: V) -> Result<(), Error> {
        self.write(key, Write::Update(value)).await
    }

    /// Removes `key` from the shared tier and invalidates it fleet-wide.
    ///
    /// Deleting an absent key succeeds and still publishes a delete event.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn delete(&self, key: &CacheKey) -> Result<(), Error> {
        self.write(key, Write::Delete).await
    }

    /// Removes `key` from this node's local tier only.
    ///
    /// Idempotent. Any read of `key` already in flight will not backfill the
    /// value it fetched.
    ///
    /// # Errors
    ///
    /// Returns the local tier's error.
    pub async fn evict_local(&self, key: &CacheKey) -> Result<(), Error> {
        let inner = &*self.inner;
        inner.epochs.bump(key);

        match inner.local.remove(key).await {
            Ok(()) => {
                inner.telemetry.record(CacheOperation::Evict, CacheActivity::Evicted, Some(key), None);
                Ok(())
            }
            Err(error) => {
                inner.telemetry.record_error(CacheOperation::Evict, Some(key), &error);
                Err(error)
            }
        }
    }

    /// Clears this node's local tier.
    ///
    /// Used when invalidation events may have been missed.
    ///
    /// # Errors
    ///
    /// Returns the local tier's error.
    pub async fn evict_all_local(&self) -> Result<(), Error> {
        let inner = &*self.inner;
        inner.epochs.bump_all();

        match inner.local.clear().await {
            Ok(()) => {
                inner.telemetry.record(CacheOperation::Clear, CacheActivity::Cleared, None, None);
                Ok(())
            }
            Err(error) => {
                inner.telemetry.record_error(CacheOperation::Clear, None, &error);
                Err(error)
            }
        }
    }

    /// Returns the cached value, or loads, stores and returns it on a miss.
    ///
    /// `loader` runs only when neither tier holds `key`. A loaded value is
    /// written through [`update`](Self::update); if that write fails the value
    /// is still returned and the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns shared-tier errors from the read and any error from `loader`.
    pub async fn get_or_load<F, Fut>(&self, key: &CacheKey, loader: F) -> Result<Option<V>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, Error>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(Some(value));
        }

        let Some(value) = loader().await? else {
            return Ok(None);
        };

        // Failures are logged by `write`.
        let _ = self.update(key, value.clone()).await;
        Ok(Some(value))
    }

    /// The node name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.telemetry.node()
    }

    /// The options the coordinator was built with.
    #[must_use]
    pub fn options(&self) -> &CoordinatorOptions {
        &self.inner.options
    }

    /// The local tier.
    #[must_use]
    pub fn local(&self) -> &L {
        &self.inner.local
    }

    /// The shared tier.
    #[must_use]
    pub fn shared(&self) -> &S {
        &self.inner.shared
    }

    /// The lock provider.
    #[must_use]
    pub fn locks(&self) -> &K {
        &self.inner.locks
    }

    /// The invalidation bus.
    #[must_use]
    pub fn bus(&self) -> &B {
        &self.inner.bus
    }

    /// The clock timing operations.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        self.inner.telemetry.clock()
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.inner.telemetry
    }

    async fn backfill(&self, key: &CacheKey, value: V, epoch: u64) {
        let inner = &*self.inner;

        if inner.epochs.current(key) != epoch {
            inner
                .telemetry
                .record(CacheOperation::Get, CacheActivity::BackfillSkipped, Some(key), None);
            return;
        }

        if let Err(error) = inner.local.put(key, value).await {
            inner.telemetry.record_error(CacheOperation::Get, Some(key), &error);
            return;
        }

        // An eviction that landed between the check and the put must win.
        if inner.epochs.current(key) != epoch {
            if let Err(error) = inner.local.remove(key).await {
                inner.telemetry.record_error(CacheOperation::Get, Some(key), &error);
            }
            inner
                .telemetry
                .record(CacheOperation::Get, CacheActivity::BackfillSkipped, Some(key), None);
            return;
        }

        inner.telemetry.record(CacheOperation::Get, CacheActivity::Backfill, Some(key), None);
    }

    async fn write(&self, key: &CacheKey, write: Write<V>) -> Result<(), Error> {
        let inner = &*self.inner;
        let operation = write.operation();
        let lock_key = inner.options.lock.lock_key(key);

        let outcome = with_lock(&inner.locks, &lock_key, &inner.options.lock, self.write_locked(key, write)).await;

        match outcome {
            Ok(()) => Ok(()),
            Err(error) if error.is_lock_timeout() => match inner.options.lock_timeout_policy {
                LockTimeoutPolicy::Fail => {
                    inner
                        .telemetry
                        .record_failure(operation, CacheActivity::LockTimeout, Some(key), &error);
                    Err(error)
                }
                LockTimeoutPolicy::Skip => {
                    inner
                        .telemetry
                        .record_failure(operation, CacheActivity::WriteSkipped, Some(key), &error);
                    Ok(())
                }
            },
            Err(error) => {
                inner.telemetry.record_error(operation, Some(key), &error);
                Err(error)
            }
        }
    }

    async fn write_locked(&self, key: &CacheKey, write: Write<V>) -> Result<(), Error> {
        let inner = &*self.inner;
        let stopwatch = inner.telemetry.clock().stopwatch();
        let operation = write.operation();

        let event = match write {
            Write::Update(value) => {
                inner.shared.put(key, value).await?;
                inner
                    .telemetry
                    .record(operation, CacheActivity::Written, Some(key), Some(stopwatch.elapsed()));
                InvalidationEvent::update(key.clone())
            }
            Write::Delete => {
                inner.shared.remove(key).await?;
                inner
                    .telemetry
                    .record(operation, CacheActivity::Deleted, Some(key), Some(stopwatch.elapsed()));
                InvalidationEvent::delete(key.clone())
            }
        };

        // Failures are logged by `evict_local`; the node's own listener evicts again on delivery.
        let _ = self.evict_local(key).await;

        let payload = event.encode()?;
        inner.bus.publish(&inner.options.topic, payload).await?;
        inner
            .telemetry
            .record(operation, CacheActivity::Published, Some(key), Some(stopwatch.elapsed()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;
    use tiersync_bus::MemoryBus;
    use tiersync_lock::MemoryLockProvider;
    use tiersync_tier::testing::MockTier;

    use super::*;
    use crate::telemetry::testing::LogCapture;

    type TestCoordinator = Coordinator<String, MockTier<String>, MockTier<String>, MemoryLockProvider, MemoryBus>;

    fn coordinator(local: &MockTier<String>, shared: &MockTier<String>) -> TestCoordinator {
        let clock = ClockControl::new().auto_advance_timers(true).to_clock();
        Coordinator::builder::<String>(clock.clone())
            .local(local.clone())
            .shared(shared.clone())
            .locks(MemoryLockProvider::new(clock))
            .bus(MemoryBus::new())
            .name("unit")
            .build()
    }

    #[tokio::test]
    async fn eviction_during_shared_read_suppresses_backfill() {
        let local = MockTier::new();
        let shared = MockTier::new();
        let coordinator = coordinator(&local, &shared);
        let key = CacheKey::from("user:1");

        let epoch = coordinator.inner.epochs.current(&key);
        coordinator.evict_local(&key).await.expect("evict");
        coordinator.backfill(&key, "stale".to_string(), epoch).await;

        assert!(!local.contains_key(&key));
    }

    #[tokio::test]
    async fn backfill_with_current_epoch_populates_local() {
        let local = MockTier::new();
        let shared = MockTier::new();
        let coordinator = coordinator(&local, &shared);
        let key = CacheKey::from("user:1");

        let epoch = coordinator.inner.epochs.current(&key);
        coordinator.backfill(&key, "fresh".to_string(), epoch).await;

        assert_eq!(local.peek(&key), Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn read_path_logs_tier_activity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let local = MockTier::new();
        let shared = MockTier::new();
        let coordinator = coordinator(&local, &shared);
        let key = CacheKey::from("user:9");

        assert_eq!(coordinator.get(&key).await.expect("get"), None);
        capture.assert_contains("miss");

        shared.put(&key, "v".to_string()).await.expect("seed");
        coordinator.get(&key).await.expect("get");
        capture.assert_contains("shared_hit");
        capture.assert_contains("backfill");

        coordinator.get(&key).await.expect("get");
        capture.assert_contains("local_hit");
        capture.assert_contains("unit");
    }

    #[tokio::test]
    async fn write_path_logs_written_and_published() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let local = MockTier::new();
        let shared = MockTier::new();
        let coordinator = coordinator(&local, &shared);

        coordinator.update(&CacheKey::from("user:1"), "v1".to_string()).await.expect("update");
        coordinator.delete(&CacheKey::from("user:1")).await.expect("delete");

        capture.assert_contains("cache.update");
        capture.assert_contains("written");
        capture.assert_contains("published");
        capture.assert_contains("cache.delete");
        capture.assert_contains("deleted");
    }

    #[test]
    fn debug_shows_options() {
        let coordinator = coordinator(&MockTier::new(), &MockTier::new());
        let debug = format!("{coordinator:?}");
        assert!(debug.contains("Coordinator"));
        assert!(debug.contains("unit"));
    }
}
