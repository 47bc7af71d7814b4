// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one logical cached item across every tier and every instance.
///
/// Keys are opaque to the cache. Callers are responsible for namespacing them,
/// typically by prefixing the entity type, which [`CacheKey::namespaced`] does.
///
/// # Examples
///
/// ```
/// use tiersync_tier::CacheKey;
///
/// let key = CacheKey::namespaced("user", 42);
/// assert_eq!(key.as_str(), "user:42");
/// assert_eq!(key, CacheKey::from("user:42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Creates a `"{namespace}:{id}"` key.
    pub fn namespaced(namespace: &str, id: impl fmt::Display) -> Self {
        Self(format!("{namespace}:{id}"))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key with `prefix` prepended.
    ///
    /// Used to derive the name of the fleet-wide lock guarding this key.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> String {
        let mut out = String::with_capacity(prefix.len() + self.0.len());
        out.push_str(prefix);
        out.push_str(&self.0);
        out
    }

    /// Consumes the key and returns the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
