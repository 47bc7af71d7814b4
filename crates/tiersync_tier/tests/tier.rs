// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `CacheTier` default methods and the `Arc` forwarding impl.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tiersync_tier::{CacheKey, CacheTier, Error};

/// Minimal implementation that only provides required methods.
struct MinimalTier<V> {
    data: Mutex<HashMap<CacheKey, V>>,
}

impl<V> MinimalTier<V> {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> CacheTier<V> for MinimalTier<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, value: V) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").clear();
        Ok(())
    }
}

#[tokio::test]
async fn get_miss_returns_none() {
    let tier = MinimalTier::<i32>::new();
    assert!(tier.get(&CacheKey::from("missing")).await.expect("get").is_none());
}

#[tokio::test]
async fn put_then_get_returns_value() {
    let tier = MinimalTier::<i32>::new();
    let key = CacheKey::from("key");
    tier.put(&key, 42).await.expect("put");
    assert_eq!(tier.get(&key).await.expect("get"), Some(42));
}

#[tokio::test]
async fn remove_absent_key_succeeds() {
    let tier = MinimalTier::<i32>::new();
    tier.remove(&CacheKey::from("never-there")).await.expect("remove");
    tier.remove(&CacheKey::from("never-there")).await.expect("second remove");
}

#[test]
fn default_len_and_is_empty_are_unknown() {
    let tier = MinimalTier::<i32>::new();
    assert_eq!(tier.len(), None);
    assert_eq!(tier.is_empty(), None);
}

#[tokio::test]
async fn arc_forwards_to_inner_tier() {
    let tier = Arc::new(MinimalTier::<&'static str>::new());
    let key = CacheKey::namespaced("user", 1);

    CacheTier::put(&tier, &key, "v1").await.expect("put");
    assert_eq!(CacheTier::get(&tier, &key).await.expect("get"), Some("v1"));

    CacheTier::clear(&tier).await.expect("clear");
    assert_eq!(CacheTier::get(&tier, &key).await.expect("get"), None);
}
