// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cross-node invalidation through the listener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tick::Clock;
use tiersync::{
    CacheKey, CacheNode, CacheTier, Coordinator, Error, InMemoryTier, InvalidationEvent, InvalidationListener, ListenerOptions,
};
use tiersync_bus::{DEFAULT_TOPIC, InvalidationBus, MemoryBus, MemorySubscription};
use tiersync_lock::MemoryLockProvider;

type MemoryCoordinator = Coordinator<String, InMemoryTier<String>, InMemoryTier<String>, MemoryLockProvider, MemoryBus>;

/// Shared infrastructure standing in for one deployment.
struct Fleet {
    clock: Clock,
    shared: InMemoryTier<String>,
    locks: MemoryLockProvider,
    bus: MemoryBus,
}

impl Fleet {
    fn new() -> Self {
        Self::with_bus(MemoryBus::new())
    }

    fn with_bus(bus: MemoryBus) -> Self {
        let clock = Clock::new_tokio();
        Self {
            locks: MemoryLockProvider::new(clock.clone()),
            clock,
            shared: InMemoryTier::new(),
            bus,
        }
    }

    fn coordinator(&self, name: &str) -> MemoryCoordinator {
        Coordinator::builder::<String>(self.clock.clone())
            .local(InMemoryTier::new())
            .shared(self.shared.clone())
            .locks(self.locks.clone())
            .bus(self.bus.clone())
            .name(name)
            .build()
    }

    async fn node(&self, name: &str) -> CacheNode<String, InMemoryTier<String>, InMemoryTier<String>, MemoryLockProvider, MemoryBus> {
        let options = ListenerOptions::default().initial_backoff(Duration::from_millis(10));
        CacheNode::start(self.coordinator(name), options).await.unwrap()
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const POLL_ATTEMPTS: u32 = 200;

async fn locally_cached(coordinator: &MemoryCoordinator, key: &CacheKey) -> bool {
    coordinator.local().get(key).await.unwrap().is_some()
}

async fn until_evicted(coordinator: &MemoryCoordinator, key: &CacheKey) {
    for _ in 0..POLL_ATTEMPTS {
        if !locally_cached(coordinator, key).await {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    panic!("{key} was never evicted from {}", coordinator.name());
}

async fn until_subscribers(bus: &MemoryBus, count: usize) {
    for _ in 0..POLL_ATTEMPTS {
        if bus.subscriber_count(DEFAULT_TOPIC) == count {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    panic!("expected {count} subscribers, found {}", bus.subscriber_count(DEFAULT_TOPIC));
}

#[tokio::test]
async fn write_on_one_node_evicts_the_other() {
    let fleet = Fleet::new();
    let a = fleet.node("a").await;
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 2);

    a.coordinator().update(&key, "v1".to_string()).await.unwrap();
    assert_eq!(b.coordinator().get(&key).await.unwrap(), Some("v1".to_string()));
    assert!(locally_cached(b.coordinator(), &key).await);

    a.coordinator().update(&key, "v2".to_string()).await.unwrap();

    until_evicted(b.coordinator(), &key).await;
    assert_eq!(b.coordinator().get(&key).await.unwrap(), Some("v2".to_string()));
}

#[tokio::test]
async fn delete_on_one_node_evicts_the_other() {
    let fleet = Fleet::new();
    let a = fleet.node("a").await;
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 3);

    a.coordinator().update(&key, "v".to_string()).await.unwrap();
    b.coordinator().get(&key).await.unwrap();

    a.coordinator().delete(&key).await.unwrap();

    until_evicted(b.coordinator(), &key).await;
    assert_eq!(b.coordinator().get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_payloads_are_dropped_and_listening_continues() {
    let fleet = Fleet::new();
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 4);
    b.coordinator().local().put(&key, "stale".to_string()).await.unwrap();

    let malformed: [&[u8]; 3] = [b"not json", br#"{"key":"user:4"}"#, br#"{"key":"user:4","operation":"upsert"}"#];
    for payload in malformed {
        fleet.bus.publish(DEFAULT_TOPIC, payload.to_vec()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(locally_cached(b.coordinator(), &key).await);

    let event = InvalidationEvent::update(key.clone());
    fleet.bus.publish(DEFAULT_TOPIC, event.encode().unwrap()).await.unwrap();

    until_evicted(b.coordinator(), &key).await;
}

#[tokio::test]
async fn events_for_other_keys_leave_local_entries_alone() {
    let fleet = Fleet::new();
    let b = fleet.node("b").await;
    let kept = CacheKey::namespaced("user", 5);
    let evicted = CacheKey::namespaced("user", 6);
    b.coordinator().local().put(&kept, "v".to_string()).await.unwrap();
    b.coordinator().local().put(&evicted, "v".to_string()).await.unwrap();

    let event = InvalidationEvent::delete(evicted.clone());
    fleet.bus.publish(DEFAULT_TOPIC, event.encode().unwrap()).await.unwrap();

    until_evicted(b.coordinator(), &evicted).await;
    assert!(locally_cached(b.coordinator(), &kept).await);
}

#[tokio::test]
async fn lagging_listener_clears_local_tier() {
    let fleet = Fleet::with_bus(MemoryBus::with_capacity(2));
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 7);
    b.coordinator().local().put(&key, "v".to_string()).await.unwrap();

    // Publishing never yields, so the listener cannot keep up on this runtime.
    for id in 100..105 {
        let event = InvalidationEvent::update(CacheKey::namespaced("other", id));
        fleet.bus.publish(DEFAULT_TOPIC, event.encode().unwrap()).await.unwrap();
    }

    until_evicted(b.coordinator(), &key).await;
}

#[tokio::test]
async fn closed_subscription_is_reestablished_and_local_tier_cleared() {
    let fleet = Fleet::new();
    let a = fleet.node("a").await;
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 8);
    b.coordinator().local().put(&key, "v".to_string()).await.unwrap();

    fleet.bus.close_topic(DEFAULT_TOPIC);

    until_evicted(b.coordinator(), &key).await;
    until_subscribers(&fleet.bus, 2).await;

    a.coordinator().update(&key, "v2".to_string()).await.unwrap();
    assert_eq!(b.coordinator().get(&key).await.unwrap(), Some("v2".to_string()));
    a.coordinator().update(&key, "v3".to_string()).await.unwrap();

    until_evicted(b.coordinator(), &key).await;
}

#[tokio::test]
async fn shutdown_stops_listening() {
    let fleet = Fleet::new();
    let b = fleet.node("b").await;
    let key = CacheKey::namespaced("user", 9);
    until_subscribers(&fleet.bus, 1).await;

    let coordinator = b.shutdown();
    until_subscribers(&fleet.bus, 0).await;

    coordinator.local().put(&key, "v".to_string()).await.unwrap();
    let event = InvalidationEvent::update(key.clone());
    fleet.bus.publish(DEFAULT_TOPIC, event.encode().unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(locally_cached(&coordinator, &key).await);
}

#[tokio::test]
async fn listener_started_directly_evicts_on_delivery() {
    let fleet = Fleet::new();
    let coordinator = fleet.coordinator("direct");
    let handle = InvalidationListener::new(coordinator.clone()).start().await.unwrap();
    let key = CacheKey::namespaced("user", 10);
    coordinator.local().put(&key, "v".to_string()).await.unwrap();

    let event = InvalidationEvent::update(key.clone());
    fleet.bus.publish(DEFAULT_TOPIC, event.encode().unwrap()).await.unwrap();

    until_evicted(&coordinator, &key).await;
    assert!(!handle.is_finished());
    handle.shutdown();
}

/// A bus whose subscribe can be switched to fail, counting every attempt.
#[derive(Debug, Clone, Default)]
struct UnreachableBus {
    inner: MemoryBus,
    failing: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl InvalidationBus for UnreachableBus {
    type Subscription = MemorySubscription;

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Error> {
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> Result<MemorySubscription, Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::provider("bus unreachable"));
        }
        self.inner.subscribe(topic).await
    }
}

#[tokio::test]
async fn zero_backoff_does_not_spin_while_bus_is_down() {
    let clock = Clock::new_tokio();
    let bus = UnreachableBus::default();
    let coordinator = Coordinator::builder::<String>(clock.clone())
        .local(InMemoryTier::new())
        .shared(InMemoryTier::new())
        .locks(MemoryLockProvider::new(clock))
        .bus(bus.clone())
        .build();
    let options = ListenerOptions::default()
        .initial_backoff(Duration::ZERO)
        .max_backoff(Duration::ZERO);
    let _node = CacheNode::start(coordinator, options).await.unwrap();

    bus.failing.store(true, Ordering::SeqCst);
    bus.inner.close_topic(DEFAULT_TOPIC);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let attempts = bus.attempts.load(Ordering::SeqCst);
    assert!(attempts > 1, "listener never tried to resubscribe");
    assert!(attempts <= 20, "listener retried {attempts} times in 100ms");

    bus.failing.store(false, Ordering::SeqCst);
    until_subscribers(&bus.inner, 1).await;
}
