// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiersync_tier::CacheKey;

/// Lock naming and timing for cache writes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tiersync_lock::LockSettings;
/// use tiersync_tier::CacheKey;
///
/// let settings = LockSettings::default().wait(Duration::from_secs(1));
/// assert_eq!(settings.lock_key(&CacheKey::from("user:1")), "lock:user:1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct LockSettings {
    /// Prepended to the cache key to form the lock key.
    pub prefix: String,
    /// How long a writer waits for the lock before giving up.
    pub wait: Duration,
    /// How long a granted lock stays held without a release.
    pub lease: Duration,
}

impl LockSettings {
    /// Default lock key prefix.
    pub const DEFAULT_PREFIX: &'static str = "lock:";
    /// Default acquisition wait.
    pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);
    /// Default lease.
    pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);

    /// Sets the lock key prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the acquisition wait.
    #[must_use]
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Sets the lease.
    #[must_use]
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Returns the lock key guarding `key`.
    #[must_use]
    pub fn lock_key(&self, key: &CacheKey) -> String {
        key.prefixed(&self.prefix)
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            prefix: Self::DEFAULT_PREFIX.to_string(),
            wait: Self::DEFAULT_WAIT,
            lease: Self::DEFAULT_LEASE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = LockSettings::default();
        assert_eq!(settings.prefix, "lock:");
        assert_eq!(settings.wait, Duration::from_secs(5));
        assert_eq!(settings.lease, Duration::from_secs(30));
    }

    #[test]
    fn custom_prefix_builds_lock_key() {
        let settings = LockSettings::default().prefix("mutex/");
        assert_eq!(settings.lock_key(&CacheKey::namespaced("order", 9)), "mutex/order:9");
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let settings: LockSettings =
            serde_json::from_str(r#"{"wait":{"secs":1,"nanos":0}}"#).expect("valid settings");
        assert_eq!(settings.wait, Duration::from_secs(1));
        assert_eq!(settings.lease, LockSettings::DEFAULT_LEASE);
        assert_eq!(settings.prefix, LockSettings::DEFAULT_PREFIX);
    }
}
