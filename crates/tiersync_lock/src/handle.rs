// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Proof of a held lock.
///
/// A handle names the lock, carries the ownership token the backend checks on
/// release, and records the lease it was granted with. It is consumed by
/// [`LockProvider::release`](crate::LockProvider::release), so it cannot be
/// released twice.
#[derive(Debug, PartialEq, Eq)]
pub struct LockHandle {
    lock_key: String,
    token: String,
    lease: Duration,
}

impl LockHandle {
    /// Creates a handle. Called by [`LockProvider`](crate::LockProvider) implementations.
    #[must_use]
    pub fn new(lock_key: impl Into<String>, token: impl Into<String>, lease: Duration) -> Self {
        Self {
            lock_key: lock_key.into(),
            token: token.into(),
            lease,
        }
    }

    /// Generates a fresh ownership token.
    #[must_use]
    pub fn generate_token() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// The name of the held lock.
    #[must_use]
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }

    /// The ownership token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The lease the lock was granted with.
    #[must_use]
    pub fn lease(&self) -> Duration {
        self.lease
    }
}
