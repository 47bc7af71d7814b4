// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tiersync_tier::Error;

use crate::{LockProvider, LockSettings};

/// Runs `protected` while holding `lock_key`.
///
/// The lock is acquired with the wait and lease from `settings` and released
/// after `protected` completes, whether it succeeded or not. A failed release
/// is logged and does not change the outcome; the lease frees the lock
/// eventually. If the caller drops the returned future mid-flight, the lease
/// is what frees the lock.
///
/// # Errors
///
/// Returns a lock-timeout error when the lock was not acquired within the
/// wait, in which case `protected` never runs. Acquisition provider errors and
/// errors from `protected` are returned unchanged.
pub async fn with_lock<P, F, T>(provider: &P, lock_key: &str, settings: &LockSettings, protected: F) -> Result<T, Error>
where
    P: LockProvider,
    F: Future<Output = Result<T, Error>>,
{
    let Some(handle) = provider.try_acquire(lock_key, settings.wait, settings.lease).await? else {
        return Err(Error::lock_timeout(lock_key));
    };

    let outcome = protected.await;

    if let Err(error) = provider.release(handle).await {
        tracing::warn!(lock.key = lock_key, error = %error, "failed to release lock");
    }

    outcome
}
