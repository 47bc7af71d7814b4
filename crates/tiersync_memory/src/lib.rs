// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process cache tier backed by moka.
//!
//! [`InMemoryTier`] is the local tier of a tiersync node: bounded, expiring,
//! private to the process. Capacity and expiry are moka's job; configure them
//! with [`InMemoryTierBuilder`] without exposing moka types.
//!
//! Clones share the same storage, so a single `InMemoryTier` handed to several
//! coordinators also works as an in-process stand-in for the shared tier.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use tiersync_memory::InMemoryTier;
//! use tiersync_tier::{CacheKey, CacheTier};
//!
//! # futures::executor::block_on(async {
//! let tier = InMemoryTier::<String>::builder()
//!     .max_capacity(10_000)
//!     .time_to_live(Duration::from_secs(600))
//!     .build();
//!
//! let key = CacheKey::from("user:1");
//! tier.put(&key, "alice".to_string()).await?;
//! assert_eq!(tier.get(&key).await?, Some("alice".to_string()));
//! # Ok::<(), tiersync_tier::Error>(())
//! # });
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryTierBuilder;
#[doc(inline)]
pub use tier::InMemoryTier;
