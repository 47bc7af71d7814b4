// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two Nodes Sharing a Cache Example
//!
//! Simulates two server instances that each keep a local tier in front of a
//! shared tier. A profile update on one instance reaches the other through
//! the invalidation bus, so neither keeps serving the old profile.
//!
//! Flow:
//! 1. Node A loads a profile from the "database" and writes it through.
//! 2. Node B reads it from the shared tier and caches it locally.
//! 3. Node A updates the profile; node B's local copy is evicted.
//! 4. Node B reads again and sees the new profile.

use std::time::Duration;

use tick::Clock;
use tiersync::{CacheKey, CacheNode, CacheTier, Coordinator, InMemoryTier, ListenerOptions};
use tiersync_bus::MemoryBus;
use tiersync_lock::MemoryLockProvider;

#[derive(Clone, Debug, PartialEq)]
struct Profile {
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> tiersync::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let clock = Clock::new_tokio();
    let shared = InMemoryTier::<Profile>::new();
    let locks = MemoryLockProvider::new(clock.clone());
    let bus = MemoryBus::new();

    let build = |name: &str| {
        Coordinator::builder::<Profile>(clock.clone())
            .local(InMemoryTier::with_capacity(10_000))
            .shared(shared.clone())
            .locks(locks.clone())
            .bus(bus.clone())
            .name(name)
            .build()
    };

    let a = CacheNode::start(build("node-a"), ListenerOptions::default()).await?;
    let b = CacheNode::start(build("node-b"), ListenerOptions::default()).await?;

    let key = CacheKey::namespaced("user", 42);

    let loaded = a
        .coordinator()
        .get_or_load(&key, || async {
            Ok(Some(Profile {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            }))
        })
        .await?;
    println!("node-a loaded {loaded:?}");

    let seen = b.coordinator().get(&key).await?;
    println!("node-b read {seen:?}");

    a.coordinator()
        .update(
            &key,
            Profile {
                name: "Alice".to_string(),
                email: "alice@contoso.com".to_string(),
            },
        )
        .await?;

    // Give node B's listener a moment to apply the invalidation.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cached = b.coordinator().local().get(&key).await?;
    println!("node-b local copy after update: {cached:?}");

    let seen = b.coordinator().get(&key).await?;
    println!("node-b read {seen:?}");

    a.coordinator().delete(&key).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("node-b read after delete: {:?}", b.coordinator().get(&key).await?);

    drop(a.shutdown());
    drop(b.shutdown());
    Ok(())
}
