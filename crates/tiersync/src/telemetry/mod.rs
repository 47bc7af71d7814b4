// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events for coordinator and listener activity.
//!
//! Every event carries the node name, the operation, the activity and, where
//! known, the key and the duration. Severity is fixed per activity.

use std::sync::Arc;
use std::time::Duration;

use tick::Clock;
use tiersync_tier::{CacheKey, Error};

pub(crate) mod attributes;
#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Update,
    Delete,
    Evict,
    Clear,
    Listen,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Update => "cache.update",
            Self::Delete => "cache.delete",
            Self::Evict => "cache.evict",
            Self::Clear => "cache.clear",
            Self::Listen => "cache.listen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    LocalHit,
    SharedHit,
    Miss,
    Backfill,
    BackfillSkipped,
    Written,
    Deleted,
    Published,
    LockTimeout,
    WriteSkipped,
    Evicted,
    Cleared,
    Subscribed,
    Lagged,
    DecodeFailed,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalHit => "local_hit",
            Self::SharedHit => "shared_hit",
            Self::Miss => "miss",
            Self::Backfill => "backfill",
            Self::BackfillSkipped => "backfill_skipped",
            Self::Written => "written",
            Self::Deleted => "deleted",
            Self::Published => "published",
            Self::LockTimeout => "lock_timeout",
            Self::WriteSkipped => "write_skipped",
            Self::Evicted => "evicted",
            Self::Cleared => "cleared",
            Self::Subscribed => "subscribed",
            Self::Lagged => "lagged",
            Self::DecodeFailed => "decode_failed",
            Self::Error => "error",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::LocalHit | Self::SharedHit | Self::Miss | Self::Backfill | Self::BackfillSkipped | Self::Evicted => {
                Severity::Debug
            }
            Self::Written | Self::Deleted | Self::Published | Self::Cleared | Self::Subscribed => Severity::Info,
            Self::LockTimeout | Self::WriteSkipped | Self::Lagged | Self::DecodeFailed => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Emits log events for one node and times operations with its clock.
#[derive(Debug, Clone)]
pub(crate) struct Telemetry {
    node: Arc<str>,
    clock: Clock,
}

impl Telemetry {
    pub fn new(node: &str, clock: Clock) -> Self {
        Self {
            node: Arc::from(node),
            clock,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn record(&self, operation: CacheOperation, activity: CacheActivity, key: Option<&CacheKey>, duration: Option<Duration>) {
        emit(&self.node, operation, activity, key, duration, None);
    }

    pub fn record_error(&self, operation: CacheOperation, key: Option<&CacheKey>, error: &Error) {
        emit(&self.node, operation, CacheActivity::Error, key, None, Some(error));
    }

    pub fn record_failure(&self, operation: CacheOperation, activity: CacheActivity, key: Option<&CacheKey>, error: &Error) {
        emit(&self.node, operation, activity, key, None, Some(error));
    }
}

fn emit(
    node: &str,
    operation: CacheOperation,
    activity: CacheActivity,
    key: Option<&CacheKey>,
    duration: Option<Duration>,
    error: Option<&Error>,
) {
    let op = operation.as_str();
    let act = activity.as_str();
    let key = key.map(CacheKey::as_str);
    let duration_ns = duration.map(|d| d.as_nanos());
    let error = error.map(tracing::field::display);

    // Field names must match the constants in attributes.rs.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(
                tiersync.node = node,
                cache.key = key,
                cache.operation = op,
                cache.activity = act,
                cache.duration_ns = ?duration_ns,
                error = error,
                "tiersync.event"
            )
        };
    }

    match activity.severity() {
        Severity::Debug => emit_event!(debug),
        Severity::Info => emit_event!(info),
        Severity::Warn => emit_event!(warn),
        Severity::Error => emit_event!(error),
    }
}
