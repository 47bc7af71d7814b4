// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coordinator and listener configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiersync_bus::DEFAULT_TOPIC;
use tiersync_lock::LockSettings;

/// What a write does when its lock cannot be acquired within the wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTimeoutPolicy {
    /// Return a lock-timeout error to the caller.
    #[default]
    Fail,
    /// Log a warning and report success without writing anything.
    ///
    /// Callers cannot tell a skipped write from a completed one. Only use this
    /// where a lost write is acceptable.
    Skip,
}

/// Settings for a [`Coordinator`](crate::Coordinator).
///
/// Hosts typically embed this in their own configuration:
///
/// ```
/// use tiersync::{CoordinatorOptions, LockTimeoutPolicy};
///
/// let options: CoordinatorOptions = serde_json::from_str(
///     r#"{ "name": "node-a", "lock_timeout_policy": "skip" }"#,
/// )?;
///
/// assert_eq!(options.name, "node-a");
/// assert_eq!(options.topic, "cache:update:topic");
/// assert_eq!(options.lock_timeout_policy, LockTimeoutPolicy::Skip);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CoordinatorOptions {
    /// Node label attached to every log event.
    pub name: String,
    /// Bus topic carrying invalidation events.
    pub topic: String,
    /// Lock naming, wait and lease.
    pub lock: LockSettings,
    /// Behavior when the lock wait elapses.
    pub lock_timeout_policy: LockTimeoutPolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            name: "tiersync".to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            lock: LockSettings::default(),
            lock_timeout_policy: LockTimeoutPolicy::default(),
        }
    }
}

impl CoordinatorOptions {
    /// Sets the node label.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the invalidation topic.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Sets the lock settings.
    #[must_use]
    pub fn lock(mut self, lock: LockSettings) -> Self {
        self.lock = lock;
        self
    }

    /// Sets the lock-timeout policy.
    #[must_use]
    pub fn lock_timeout_policy(mut self, policy: LockTimeoutPolicy) -> Self {
        self.lock_timeout_policy = policy;
        self
    }
}

/// Settings for an [`InvalidationListener`](crate::InvalidationListener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ListenerOptions {
    /// Delay before the first resubscription attempt after a failure.
    ///
    /// Raised to [`MIN_BACKOFF`](Self::MIN_BACKOFF) if smaller.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling resubscription delay.
    pub max_backoff: Duration,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl ListenerOptions {
    /// Sets the first resubscription delay.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the resubscription delay cap.
    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Lower bound applied to every resubscription delay.
    pub const MIN_BACKOFF: Duration = Duration::from_millis(10);

    pub(crate) fn first_backoff(&self) -> Duration {
        self.initial_backoff.min(self.max_backoff).max(Self::MIN_BACKOFF)
    }

    pub(crate) fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff).max(Self::MIN_BACKOFF)
    }
}
