// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lock Timeout Example
//!
//! Shows what a write does when another node holds the key's lock for longer
//! than the configured wait. A controlled clock advances through the wait
//! instantly, so the example runs without real delays.
//!
//! - With `LockTimeoutPolicy::Fail` the write returns a lock-timeout error.
//! - With `LockTimeoutPolicy::Skip` the write is logged and dropped.
//!
//! In both cases the shared tier keeps its previous value.

use tick::ClockControl;
use tiersync::{CacheKey, CacheTier, Coordinator, InMemoryTier, LockTimeoutPolicy};
use tiersync_bus::MemoryBus;
use tiersync_lock::{LockProvider, LockSettings, MemoryLockProvider};

#[tokio::main]
async fn main() -> tiersync::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let clock = ClockControl::new().auto_advance_timers(true).to_clock();
    let shared = InMemoryTier::<String>::new();
    let locks = MemoryLockProvider::new(clock.clone());
    let settings = LockSettings::default();

    let key = CacheKey::namespaced("order", 7);
    shared.put(&key, "pending".to_string()).await?;

    // Another node is mid-write and holds the lock.
    let held = locks
        .try_acquire(&settings.lock_key(&key), settings.wait, settings.lease)
        .await?
        .ok_or_else(|| tiersync::Error::lock_timeout(&settings.lock_key(&key)))?;

    for policy in [LockTimeoutPolicy::Fail, LockTimeoutPolicy::Skip] {
        let coordinator = Coordinator::builder::<String>(clock.clone())
            .local(InMemoryTier::new())
            .shared(shared.clone())
            .locks(locks.clone())
            .bus(MemoryBus::new())
            .lock_timeout_policy(policy)
            .build();

        match coordinator.update(&key, "shipped".to_string()).await {
            Ok(()) => println!("{policy:?}: write reported success"),
            Err(error) => println!("{policy:?}: write failed with {error}"),
        }
        println!("{policy:?}: shared tier holds {:?}", shared.get(&key).await?);
    }

    locks.release(held).await?;
    Ok(())
}
