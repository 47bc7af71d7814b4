// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tick::Clock;
use tiersync_lock::{LockHandle, LockProvider};
use tiersync_tier::Error;

use crate::millis;

/// Deletes the lock only if it still carries the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

static RELEASE: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(RELEASE_SCRIPT));

/// A [`LockProvider`] backed by Redis keys.
///
/// A lock is a key holding the owner's token, set with `NX` so only one owner
/// wins and `PX` so it expires with the lease. Waiters retry until the wait
/// elapses, timing themselves with the injected [`Clock`].
#[derive(Clone)]
pub struct RedisLockProvider {
    connection: ConnectionManager,
    clock: Clock,
    retry_interval: Duration,
}

impl fmt::Debug for RedisLockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLockProvider")
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl RedisLockProvider {
    /// Default interval between acquisition attempts.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

    /// Creates a provider on an established connection.
    #[must_use]
    pub fn new(connection: ConnectionManager, clock: Clock) -> Self {
        Self {
            connection,
            clock,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Sets the interval between acquisition attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    async fn try_set(&self, lock_key: &str, token: &str, lease: Duration) -> Result<bool, Error> {
        let mut connection = self.connection.clone();
        let reply: Option<String> = acquire_command(lock_key, token, lease)
            .query_async(&mut connection)
            .await
            .map_err(Error::provider)?;
        Ok(reply.is_some())
    }
}

fn acquire_command(lock_key: &str, token: &str, lease: Duration) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(lock_key).arg(token).arg("NX").arg("PX").arg(millis(lease));
    cmd
}

impl LockProvider for RedisLockProvider {
    async fn try_acquire(&self, lock_key: &str, wait: Duration, lease: Duration) -> Result<Option<LockHandle>, Error> {
        let token = LockHandle::generate_token();
        // A wait too long to represent never elapses.
        let deadline = self.clock.instant().checked_add(wait);

        loop {
            if self.try_set(lock_key, &token, lease).await? {
                return Ok(Some(LockHandle::new(lock_key, token, lease)));
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
        let mut connection = self.connection.clone();
        let released: i64 = RELEASE
            .key(handle.lock_key())
            .arg(handle.token())
            .invoke_async(&mut connection)
            .await
            .map_err(Error::provider)?;

        if released == 0 {
            tracing::debug!(lock.key = handle.lock_key(), "lock no longer owned, release skipped");
        }
        Ok(())
    }
}
