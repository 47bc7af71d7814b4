// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions shared by every `tiersync` crate.
//!
//! This crate defines the [`CacheTier`] trait implemented by both the local
//! (in-process) tier and the shared (out-of-process) tier, the [`CacheKey`]
//! used to address entries across the fleet, and the [`Error`] type returned by
//! all fallible operations.
//!
//! # Implementing a Cache Tier
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use tiersync_tier::{CacheKey, CacheTier, Error};
//!
//! struct SimpleTier<V>(Mutex<HashMap<CacheKey, V>>);
//!
//! impl<V> CacheTier<V> for SimpleTier<V>
//! where
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn put(&self, key: &CacheKey, value: V) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.clone(), value);
//!         Ok(())
//!     }
//!
//!     async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
//!         self.0.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn clear(&self) -> Result<(), Error> {
//!         self.0.lock().unwrap().clear();
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
mod key;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use tier::CacheTier;
