// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-key mutual exclusion for cache writes.
//!
//! Every write to a cached key runs inside a lock named after the key. The lock
//! is acquired with a bounded wait and held under a lease: a holder that
//! crashes or stalls loses the lock once the lease runs out, without anyone
//! cleaning up after it.
//!
//! - [`LockProvider`] is the backend seam: try to acquire within a wait, and
//!   release a [`LockHandle`].
//! - [`with_lock`] runs a future inside the lock and releases it on every exit
//!   path.
//! - [`MemoryLockProvider`] implements the contract in-process, driven by a
//!   [`tick::Clock`] so that waits and leases are deterministic in tests.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use tiersync_lock::{LockSettings, MemoryLockProvider, with_lock};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tiersync_tier::Result<()> {
//! let provider = MemoryLockProvider::new(Clock::new_tokio());
//! let settings = LockSettings::default();
//!
//! let value = with_lock(&provider, "lock:user:1", &settings, async { Ok(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

mod handle;
mod memory;
mod provider;
mod scoped;
mod settings;

#[doc(inline)]
pub use handle::LockHandle;
#[doc(inline)]
pub use memory::MemoryLockProvider;
#[doc(inline)]
pub use provider::LockProvider;
#[doc(inline)]
pub use scoped::with_lock;
#[doc(inline)]
pub use settings::LockSettings;
