// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tick::Clock;
use tiersync_tier::Error;

use crate::{LockHandle, LockProvider};

#[derive(Debug)]
struct Holder {
    token: String,
    // `None` when the lease is too long to represent; the lock never expires.
    expires_at: Option<Instant>,
}

impl Holder {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// An in-process [`LockProvider`].
///
/// Holders live in a map from lock key to token and lease deadline. Waiters
/// poll at the retry interval until the wait elapses. All time is read from
/// the injected [`Clock`], so tests can drive leases with `tick::ClockControl`.
///
/// Clones share the same lock table; hand a clone to each coordinator that
/// should contend on the same keys.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use tiersync_lock::{LockProvider, MemoryLockProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tiersync_tier::Result<()> {
/// let locks = MemoryLockProvider::new(Clock::new_tokio());
///
/// let first = locks.try_acquire("lock:a", Duration::ZERO, Duration::from_secs(30)).await?;
/// let second = locks.try_acquire("lock:a", Duration::ZERO, Duration::from_secs(30)).await?;
/// assert!(first.is_some());
/// assert!(second.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLockProvider {
    clock: Clock,
    retry_interval: Duration,
    holders: Arc<Mutex<HashMap<String, Holder>>>,
}

impl MemoryLockProvider {
    /// Default interval between acquisition attempts.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

    /// Creates a provider with an empty lock table.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
            holders: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sets the interval between acquisition attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Returns `true` if `lock_key` is held under an unexpired lease.
    #[must_use]
    pub fn is_locked(&self, lock_key: &str) -> bool {
        let now = self.clock.instant();
        self.holders.lock().get(lock_key).is_some_and(|holder| holder.is_live(now))
    }

    fn try_take(&self, lock_key: &str, lease: Duration) -> Option<LockHandle> {
        let now = self.clock.instant();
        let mut holders = self.holders.lock();

        if holders.get(lock_key).is_some_and(|holder| holder.is_live(now)) {
            return None;
        }

        let token = LockHandle::generate_token();
        let previous = holders.insert(
            lock_key.to_string(),
            Holder {
                token: token.clone(),
                expires_at: now.checked_add(lease),
            },
        );
        if previous.is_some() {
            tracing::debug!(lock.key = lock_key, "lock lease expired, taking over");
        }
        Some(LockHandle::new(lock_key, token, lease))
    }
}

impl LockProvider for MemoryLockProvider {
    async fn try_acquire(&self, lock_key: &str, wait: Duration, lease: Duration) -> Result<Option<LockHandle>, Error> {
        // A wait too long to represent never elapses.
        let deadline = self.clock.instant().checked_add(wait);

        loop {
            if let Some(handle) = self.try_take(lock_key, lease) {
                return Ok(Some(handle));
            }

            let now = self.clock.instant();
            let pause = match deadline {
                Some(deadline) if now >= deadline => return Ok(None),
                Some(deadline) => self.retry_interval.min(deadline - now),
                None => self.retry_interval,
            };

            self.clock.delay(pause).await;
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<(), Error> {
        let mut holders = self.holders.lock();
        match holders.get(handle.lock_key()) {
            Some(holder) if holder.token == handle.token() => {
                holders.remove(handle.lock_key());
            }
            _ => {
                tracing::debug!(lock.key = handle.lock_key(), "lock no longer owned, release skipped");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    const LEASE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn zero_wait_fails_fast_when_held() {
        let control = ClockControl::new();
        let locks = MemoryLockProvider::new(control.to_clock());

        let _held = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire").expect("free lock");
        let second = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn lease_expiry_frees_lock() {
        let control = ClockControl::new();
        let locks = MemoryLockProvider::new(control.to_clock());

        let _stale = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire").expect("free lock");
        assert!(locks.is_locked("k"));

        control.advance(LEASE + Duration::from_millis(1));
        assert!(!locks.is_locked("k"));

        let fresh = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire");
        assert!(fresh.is_some());
    }

    #[tokio::test]
    async fn stale_holder_cannot_release_new_holder() {
        let control = ClockControl::new();
        let locks = MemoryLockProvider::new(control.to_clock());

        let stale = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire").expect("free lock");
        control.advance(LEASE * 2);
        let _fresh = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire").expect("expired lock");

        locks.release(stale).await.expect("release");
        assert!(locks.is_locked("k"));
    }

    #[tokio::test]
    async fn release_frees_lock() {
        let locks = MemoryLockProvider::new(ClockControl::new().to_clock());
        let handle = locks.try_acquire("k", Duration::ZERO, LEASE).await.expect("acquire").expect("free lock");

        locks.release(handle).await.expect("release");
        assert!(!locks.is_locked("k"));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = MemoryLockProvider::new(ClockControl::new().to_clock());
        let a = locks.try_acquire("a", Duration::ZERO, LEASE).await.expect("acquire");
        let b = locks.try_acquire("b", Duration::ZERO, LEASE).await.expect("acquire");
        assert!(a.is_some());
        assert!(b.is_some());
    }
}
