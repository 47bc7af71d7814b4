// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use serde::{Deserialize, Serialize};
use tiersync_tier::{CacheKey, Error};

/// The kind of write that triggered an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// The key was written with a new value.
    Update,
    /// The key was removed.
    Delete,
}

impl Operation {
    /// Returns the wire name of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tells every node to evict one key from its local tier.
///
/// Events are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidationEvent {
    key: CacheKey,
    operation: Operation,
}

impl InvalidationEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(key: impl Into<CacheKey>, operation: Operation) -> Self {
        Self {
            key: key.into(),
            operation,
        }
    }

    /// Creates an [`Operation::Update`] event.
    #[must_use]
    pub fn update(key: impl Into<CacheKey>) -> Self {
        Self::new(key, Operation::Update)
    }

    /// Creates an [`Operation::Delete`] event.
    #[must_use]
    pub fn delete(key: impl Into<CacheKey>) -> Self {
        Self::new(key, Operation::Delete)
    }

    /// The key to evict.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The write that caused the event.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Consumes the event, returning its key.
    #[must_use]
    pub fn into_key(self) -> CacheKey {
        self.key
    }

    /// Encodes the event as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a provider error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Error::provider)
    }

    /// Decodes an event from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a decode error for invalid UTF-8 or JSON, missing fields, wrong
    /// field types and unknown operations.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(payload).map_err(Error::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lowercase_operation() {
        let payload = InvalidationEvent::update("user:1").encode().expect("encode");
        assert_eq!(payload, br#"{"key":"user:1","operation":"update"}"#);
    }

    #[test]
    fn delete_round_trips() {
        let event = InvalidationEvent::delete(CacheKey::namespaced("user", 42));
        let decoded = InvalidationEvent::decode(&event.encode().expect("encode")).expect("decode");
        assert_eq!(decoded, event);
        assert_eq!(decoded.key().as_str(), "user:42");
        assert_eq!(decoded.operation(), Operation::Delete);
    }

    #[test]
    fn ignores_field_order_and_unknown_fields() {
        let event = InvalidationEvent::decode(br#"{"operation":"delete","origin":"node-b","key":"k"}"#).expect("decode");
        assert_eq!(event, InvalidationEvent::delete("k"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases: [&[u8]; 7] = [
            b"",
            b"not json",
            br#"{"key":"k"}"#,
            br#"{"operation":"update"}"#,
            br#"{"key":"k","operation":"upsert"}"#,
            br#"{"key":42,"operation":"update"}"#,
            b"\xff\xfe",
        ];

        for payload in cases {
            let error = InvalidationEvent::decode(payload).expect_err("payload should be rejected");
            assert!(error.is_decode(), "{payload:?} produced {error}");
        }
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::Update.to_string(), "update");
        assert_eq!(Operation::Delete.to_string(), "delete");
    }

    #[test]
    fn into_key_returns_key() {
        assert_eq!(InvalidationEvent::update("a").into_key(), CacheKey::from("a"));
    }
}
