// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::Duration;

use tiersync_tier::Error;

use crate::LockHandle;

/// A backend granting named, leased locks.
///
/// Implementations must guarantee that at most one handle for a given lock key
/// is live at a time, that a lock whose lease elapsed can be acquired again,
/// and that releasing a handle whose lease already expired does not release a
/// newer holder's lock.
pub trait LockProvider: Send + Sync {
    /// Tries to acquire `lock_key`, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` when the wait elapsed with the lock still held
    /// elsewhere. A granted lock frees itself after `lease` unless released
    /// earlier.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the backend could not be reached.
    fn try_acquire(
        &self,
        lock_key: &str,
        wait: Duration,
        lease: Duration,
    ) -> impl Future<Output = Result<Option<LockHandle>, Error>> + Send;

    /// Releases a lock acquired from this provider.
    ///
    /// Releasing a lock whose lease already expired is not an error.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the backend could not be reached.
    fn release(&self, handle: LockHandle) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<T> LockProvider for Arc<T>
where
    T: LockProvider,
{
    fn try_acquire(
        &self,
        lock_key: &str,
        wait: Duration,
        lease: Duration,
    ) -> impl Future<Output = Result<Option<LockHandle>, Error>> + Send {
        (**self).try_acquire(lock_key, wait, lease)
    }

    fn release(&self, handle: LockHandle) -> impl Future<Output = Result<(), Error>> + Send {
        (**self).release(handle)
    }
}
