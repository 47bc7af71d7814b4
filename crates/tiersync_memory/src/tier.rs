// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The moka-backed tier.

use moka::future::Cache;
use tiersync_tier::{CacheKey, CacheTier, Error};

use crate::builder::InMemoryTierBuilder;

/// A concurrent in-process tier backed by `moka::future::Cache`.
///
/// Cloning is cheap and clones share storage.
///
/// # Examples
///
/// ```
/// use tiersync_memory::InMemoryTier;
/// use tiersync_tier::{CacheKey, CacheTier};
///
/// # futures::executor::block_on(async {
/// let tier = InMemoryTier::<i32>::with_capacity(100);
/// let key = CacheKey::from("answer");
///
/// tier.put(&key, 42).await?;
/// tier.remove(&key).await?;
/// assert_eq!(tier.get(&key).await?, None);
/// # Ok::<(), tiersync_tier::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<CacheKey, V>,
}

impl<V> Default for InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded tier without expiry.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a tier holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Returns a builder for capacity and expiry settings.
    #[must_use]
    pub fn builder() -> InMemoryTierBuilder<V> {
        InMemoryTierBuilder::new()
    }

    /// Applies pending evictions and expirations.
    ///
    /// Moka maintains its entry count lazily; call this before relying on
    /// [`CacheTier::len`] in tests.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub(crate) fn from_builder(builder: &InMemoryTierBuilder<V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
        }
    }
}

impl<V> CacheTier<V> for InMemoryTier<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: &CacheKey, value: V) -> Result<(), Error> {
        self.inner.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
