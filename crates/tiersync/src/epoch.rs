// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Eviction counters guarding backfill against concurrent invalidation.

use std::hash::{BuildHasher, RandomState};
use std::sync::atomic::{AtomicU64, Ordering};

use tiersync_tier::CacheKey;

const STRIPES: usize = 64;

/// Striped eviction counters.
///
/// A reader snapshots the counter for its key before reading the shared tier
/// and backfills only if the counter is unchanged afterwards. Keys sharing a
/// stripe can cause a spurious skip, never a missed one.
#[derive(Debug)]
pub(crate) struct EvictionEpochs {
    hasher: RandomState,
    stripes: [AtomicU64; STRIPES],
}

impl EvictionEpochs {
    pub fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            stripes: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn current(&self, key: &CacheKey) -> u64 {
        self.stripe(key).load(Ordering::Acquire)
    }

    /// Must be called before the local entry is removed.
    pub fn bump(&self, key: &CacheKey) {
        self.stripe(key).fetch_add(1, Ordering::AcqRel);
    }

    pub fn bump_all(&self) {
        for stripe in &self.stripes {
            stripe.fetch_add(1, Ordering::AcqRel);
        }
    }

    #[expect(clippy::cast_possible_truncation, reason = "only the low bits select a stripe")]
    fn stripe(&self, key: &CacheKey) -> &AtomicU64 {
        let index = (self.hasher.hash_one(key) as usize) % STRIPES;
        &self.stripes[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_changes_only_affected_key_epoch() {
        let epochs = EvictionEpochs::new();
        let key = CacheKey::from("user:1");
        let before = epochs.current(&key);

        epochs.bump(&key);

        assert_eq!(epochs.current(&key), before + 1);
    }

    #[test]
    fn bump_all_changes_every_key() {
        let epochs = EvictionEpochs::new();
        let keys: Vec<_> = (0..200).map(|i| CacheKey::namespaced("k", i)).collect();
        let before: Vec<_> = keys.iter().map(|key| epochs.current(key)).collect();

        epochs.bump_all();

        for (key, before) in keys.iter().zip(before) {
            assert!(epochs.current(key) > before);
        }
    }
}
