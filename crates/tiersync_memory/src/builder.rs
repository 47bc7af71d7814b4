// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory tiers.

use std::marker::PhantomData;
use std::time::Duration;

use crate::tier::InMemoryTier;

/// Builder for an [`InMemoryTier`].
///
/// The defaults produce an unbounded tier with no expiry, which is rarely what
/// a local tier wants: set at least a capacity or a time-to-live.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tiersync_memory::InMemoryTier;
///
/// let tier = InMemoryTier::<String>::builder()
///     .max_capacity(1000)
///     .time_to_live(Duration::from_secs(300))
///     .time_to_idle(Duration::from_secs(60))
///     .initial_capacity(100)
///     .name("users")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryTierBuilder<V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<V>,
}

impl<V> Default for InMemoryTierBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryTierBuilder<V> {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the maximum number of entries.
    ///
    /// Beyond it, moka evicts using `TinyLFU`.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the pre-allocation hint.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Expires entries this long after they were written.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Expires entries that were neither read nor written for this long.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the underlying cache for moka's diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the tier.
    #[must_use]
    pub fn build(self) -> InMemoryTier<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        InMemoryTier::from_builder(&self)
    }
}
