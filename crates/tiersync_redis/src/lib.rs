// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis implementations of the tiersync provider traits.
//!
//! - [`RedisTier`] is the shared tier: `GET`/`SET`/`DEL` with JSON values and
//!   an optional entry TTL.
//! - [`RedisLockProvider`] grants leased locks with `SET NX PX` and releases
//!   them with a compare-and-delete script, so an expired holder never frees
//!   someone else's lock.
//! - [`RedisBus`] publishes with `PUBLISH` and subscribes on a dedicated
//!   pub/sub connection per subscription.
//!
//! All three are cheap to clone and share their connections.
//!
//! # Example
//!
//! ```no_run
//! use tick::Clock;
//! use tiersync_redis::{RedisBus, RedisLockProvider, RedisTier};
//!
//! # async fn connect() -> tiersync_tier::Result<()> {
//! let client = redis::Client::open("redis://127.0.0.1/").map_err(tiersync_tier::Error::provider)?;
//! let connection = redis::aio::ConnectionManager::new(client.clone())
//!     .await
//!     .map_err(tiersync_tier::Error::provider)?;
//!
//! let shared = RedisTier::<String>::new(connection.clone());
//! let locks = RedisLockProvider::new(connection.clone(), Clock::new_tokio());
//! let bus = RedisBus::new(client, connection);
//! # let _ = (shared, locks, bus);
//! # Ok(())
//! # }
//! ```

mod bus;
mod lock;
mod tier;

#[doc(inline)]
pub use bus::{RedisBus, RedisSubscription};
#[doc(inline)]
pub use lock::RedisLockProvider;
#[doc(inline)]
pub use tier::RedisTier;

pub(crate) fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
