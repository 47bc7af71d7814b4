// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Fleet-wide consistency for two-tier caches.
//!
//! Each server instance keeps a fast local tier in front of a tier shared by
//! every instance. This crate keeps the local tiers from serving stale data
//! after a write anywhere in the fleet:
//!
//! - Reads check the local tier, then the shared tier, and backfill the local
//!   tier on a shared hit.
//! - Writes take a per-key lock with a bounded wait and a lease, change the
//!   shared tier, evict the local copy, then publish an invalidation event.
//! - Every instance runs an [`InvalidationListener`] that evicts the key from
//!   its local tier when the event arrives.
//!
//! Providers are pluggable: any [`CacheTier`] for either tier, any
//! [`LockProvider`](tiersync_lock::LockProvider) and any
//! [`InvalidationBus`](tiersync_bus::InvalidationBus). In-memory providers
//! ship with the workspace; Redis providers are available with the `redis`
//! feature.
//!
//! # Example
//!
//! Two nodes sharing one shared tier, lock table and bus:
//!
//! ```
//! use tick::Clock;
//! use tiersync::{CacheNode, Coordinator, InMemoryTier, ListenerOptions};
//! use tiersync_bus::MemoryBus;
//! use tiersync_lock::MemoryLockProvider;
//! use tiersync_tier::CacheKey;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tiersync::Result<()> {
//! let clock = Clock::new_tokio();
//! let shared = InMemoryTier::<String>::new();
//! let locks = MemoryLockProvider::new(clock.clone());
//! let bus = MemoryBus::new();
//!
//! let node = |name: &str| {
//!     Coordinator::builder::<String>(clock.clone())
//!         .local(InMemoryTier::with_capacity(1_000))
//!         .shared(shared.clone())
//!         .locks(locks.clone())
//!         .bus(bus.clone())
//!         .name(name)
//!         .build()
//! };
//!
//! let a = CacheNode::start(node("a"), ListenerOptions::default()).await?;
//! let b = CacheNode::start(node("b"), ListenerOptions::default()).await?;
//!
//! let key = CacheKey::namespaced("user", 2);
//! a.coordinator().update(&key, "v2".to_string()).await?;
//! assert_eq!(b.coordinator().get(&key).await?, Some("v2".to_string()));
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **`memory`** (default): re-exports [`InMemoryTier`] from `tiersync_memory`.
//! - **`redis`**: re-exports the Redis providers from `tiersync_redis`.
//! - **`test-util`**: enables `tiersync_tier::testing` and `tick::ClockControl`.

mod builder;
mod coordinator;
mod epoch;
mod listener;
mod node;
pub mod options;
mod telemetry;

#[doc(inline)]
pub use builder::CoordinatorBuilder;
#[doc(inline)]
pub use coordinator::Coordinator;
#[doc(inline)]
pub use listener::{InvalidationListener, ListenerHandle};
#[doc(inline)]
pub use node::CacheNode;
#[doc(inline)]
pub use options::{CoordinatorOptions, ListenerOptions, LockTimeoutPolicy};
#[doc(inline)]
pub use tiersync_bus::{InvalidationEvent, Operation};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use tiersync_memory::{InMemoryTier, InMemoryTierBuilder};
#[cfg(feature = "redis")]
#[doc(inline)]
pub use tiersync_redis::{RedisBus, RedisLockProvider, RedisTier};
#[doc(inline)]
pub use tiersync_tier::{CacheKey, CacheTier, Error, ErrorKind, Result};
