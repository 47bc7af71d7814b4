// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recording tier with failure injection for tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{CacheKey, CacheTier, Error};

/// An operation observed by [`MockTier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<V> {
    /// `get` was called for the key.
    Get(CacheKey),
    /// `put` was called with the key and value.
    Put(CacheKey, V),
    /// `remove` was called for the key.
    Remove(CacheKey),
    /// `clear` was called.
    Clear,
}

impl<V> TierOp<V> {
    /// Returns the key the operation targeted, if any.
    #[must_use]
    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            Self::Get(key) | Self::Put(key, _) | Self::Remove(key) => Some(key),
            Self::Clear => None,
        }
    }
}

type FailPredicate<V> = Box<dyn Fn(&TierOp<V>) -> bool + Send + Sync>;

/// An in-memory tier that records every operation and can be told to fail.
///
/// Clones share storage, the operation log and the failure predicate, so a
/// test can keep a clone to inspect what the code under test did.
///
/// # Examples
///
/// ```
/// use tiersync_tier::testing::{MockTier, TierOp};
/// use tiersync_tier::{CacheKey, CacheTier};
///
/// # futures::executor::block_on(async {
/// let tier = MockTier::<String>::new();
/// let key = CacheKey::from("user:1");
///
/// tier.put(&key, "alice".to_string()).await.unwrap();
/// tier.fail_when(|op| matches!(op, TierOp::Get(_)));
/// assert!(tier.get(&key).await.is_err());
///
/// assert_eq!(tier.operations().len(), 2);
/// # });
/// ```
pub struct MockTier<V> {
    data: Arc<Mutex<HashMap<CacheKey, V>>>,
    operations: Arc<Mutex<Vec<TierOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
}

impl<V: std::fmt::Debug> std::fmt::Debug for MockTier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<V> Clone for MockTier<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<V> Default for MockTier<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockTier<V> {
    /// Creates an empty mock tier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Creates a mock tier holding `data`.
    #[must_use]
    pub fn with_data(data: HashMap<CacheKey, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if `key` is stored, without recording an operation.
    #[must_use]
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Fails every operation for which `predicate` returns `true`.
    ///
    /// Failed operations are still recorded and leave the data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Removes the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    fn should_fail(&self, op: &TierOp<V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<V: Clone> MockTier<V> {
    /// Returns the stored value for `key`, without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    /// Returns every recorded operation in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<V>> {
        self.operations.lock().clone()
    }

    /// Forgets every recorded operation.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: TierOp<V>) -> Result<(), Error> {
        let fail = self.should_fail(&op);
        let label = match &op {
            TierOp::Get(_) => "get",
            TierOp::Put(..) => "put",
            TierOp::Remove(_) => "remove",
            TierOp::Clear => "clear",
        };
        self.operations.lock().push(op);
        if fail {
            return Err(Error::provider(format!("mock: {label} failed")));
        }
        Ok(())
    }
}

impl<V> CacheTier<V> for MockTier<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
        self.record(TierOp::Get(key.clone()))?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, value: V) -> Result<(), Error> {
        self.record(TierOp::Put(key.clone(), value.clone()))?;
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        self.record(TierOp::Remove(key.clone()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.record(TierOp::Clear)?;
        self.data.lock().clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
