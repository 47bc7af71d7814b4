// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The storage contract implemented by local and shared tiers.

use std::sync::Arc;

use crate::{CacheKey, Error};

/// A key/value store used as one tier of the cache.
///
/// The same contract serves both tiers: the local tier is in-process and
/// typically infallible, while the shared tier performs network I/O and
/// reports failures as [`ErrorKind::Provider`](crate::ErrorKind::Provider).
///
/// Capacity and expiry policies are the tier's own business; the coordinator
/// never assumes a value it put is still there.
pub trait CacheTier<V>: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &CacheKey, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove(&self, key: &CacheKey) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every entry.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the number of entries, if the tier tracks it.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries, if the tier tracks it.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

impl<V, T> CacheTier<V> for Arc<T>
where
    T: CacheTier<V>,
    V: Send,
{
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<V>, Error>> + Send {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).put(key, value)
    }

    fn remove(&self, key: &CacheKey) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).remove(key)
    }

    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).clear()
    }

    fn len(&self) -> Option<u64> {
        (**self).len()
    }

    fn is_empty(&self) -> Option<bool> {
        (**self).is_empty()
    }
}
