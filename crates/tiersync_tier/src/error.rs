// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types shared by every tier, lock and bus provider.

use std::fmt;

/// Classifies a failed operation.
///
/// The kind determines how callers react: a [`LockTimeout`](ErrorKind::LockTimeout)
/// guarantees no state was changed, a [`Provider`](ErrorKind::Provider) failure may
/// follow an already committed shared-tier write, and a [`Decode`](ErrorKind::Decode)
/// failure only ever concerns a single dropped invalidation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The per-key lock was not acquired within the wait window.
    LockTimeout,
    /// A shared tier, lock backend or bus I/O call failed.
    Provider,
    /// An invalidation message could not be decoded.
    Decode,
}

impl ErrorKind {
    /// Returns a stable, lowercase name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LockTimeout => "lock timeout",
            Self::Provider => "provider failure",
            Self::Decode => "decode failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache, lock or bus operation.
///
/// The [`kind`](Error::kind) is the part callers branch on; the underlying
/// cause is preserved in the source chain.
///
/// # Examples
///
/// ```
/// use tiersync_tier::{Error, ErrorKind};
///
/// let error = Error::provider("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Provider);
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a lock timeout error for the given lock name.
    pub fn lock_timeout(lock_key: &str) -> Self {
        Self::caused_by(ErrorKind::LockTimeout, format!("lock '{lock_key}' was not acquired in time"))
    }

    /// Creates a provider error from any underlying cause.
    pub fn provider(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Provider, cause)
    }

    /// Creates a decode error from any underlying cause.
    pub fn decode(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Decode, cause)
    }

    /// Returns what kind of failure this is.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the per-key lock was not acquired.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        self.kind == ErrorKind::LockTimeout
    }

    /// Returns `true` if a provider call failed.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        self.kind == ErrorKind::Provider
    }

    /// Returns `true` if a message could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        self.kind == ErrorKind::Decode
    }
}

/// A specialized [`Result`] type for tiersync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_starts_with_kind_and_keeps_cause() {
        let error = Error::lock_timeout("lock:user:1");
        let display = error.to_string();
        assert!(display.starts_with("lock timeout"), "unexpected display: {display}");
        assert!(display.contains("lock:user:1"), "cause missing from: {display}");
    }

    #[test]
    fn kind_predicates_are_exclusive() {
        let error = Error::decode("bad json");
        assert!(error.is_decode());
        assert!(!error.is_provider());
        assert!(!error.is_lock_timeout());
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[test]
    fn provider_accepts_std_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = Error::provider(io);
        assert!(error.is_provider());
        assert!(format!("{error:?}").contains("refused"));
    }

    #[test]
    fn result_alias_propagates() {
        fn fails() -> Result<u8> {
            Err(Error::provider("down"))
        }

        let err = fails().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }
}
