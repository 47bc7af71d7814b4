// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tiersync_tier::{CacheKey, CacheTier, Error};

use crate::millis;

const SCAN_BATCH: usize = 500;

/// The shared tier, stored in Redis.
///
/// Values are stored as JSON. When a namespace is set, every key is stored as
/// `{namespace}{key}` and [`clear`](CacheTier::clear) deletes only keys inside
/// the namespace. Without a namespace `clear` is refused, since it would have
/// to flush a database other services may share.
pub struct RedisTier<V> {
    connection: ConnectionManager,
    namespace: Option<String>,
    time_to_live: Option<Duration>,
    _value: PhantomData<fn() -> V>,
}

impl<V> fmt::Debug for RedisTier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTier")
            .field("namespace", &self.namespace)
            .field("time_to_live", &self.time_to_live)
            .finish_non_exhaustive()
    }
}

impl<V> Clone for RedisTier<V> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            namespace: self.namespace.clone(),
            time_to_live: self.time_to_live,
            _value: PhantomData,
        }
    }
}

impl<V> RedisTier<V> {
    /// Creates a tier on an established connection.
    #[must_use]
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            namespace: None,
            time_to_live: None,
            _value: PhantomData,
        }
    }

    /// Prefixes every stored key with `namespace`.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Expires stored entries after `time_to_live`.
    #[must_use]
    pub fn with_time_to_live(mut self, time_to_live: Duration) -> Self {
        self.time_to_live = Some(time_to_live);
        self
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        match &self.namespace {
            Some(namespace) => key.prefixed(namespace),
            None => key.as_str().to_string(),
        }
    }
}

fn set_command(redis_key: &str, payload: &[u8], time_to_live: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(redis_key).arg(payload);
    if let Some(ttl) = time_to_live {
        cmd.arg("PX").arg(millis(ttl));
    }
    cmd
}

impl<V> CacheTier<V> for RedisTier<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<V>, Error> {
        let mut connection = self.connection.clone();
        let raw: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.redis_key(key))
            .query_async(&mut connection)
            .await
            .map_err(Error::provider)?;

        raw.map(|bytes| serde_json::from_slice(&bytes).map_err(Error::provider))
            .transpose()
    }

    async fn put(&self, key: &CacheKey, value: V) -> Result<(), Error> {
        let payload = serde_json::to_vec(&value).map_err(Error::provider)?;
        let mut connection = self.connection.clone();
        let () = set_command(&self.redis_key(key), &payload, self.time_to_live)
            .query_async(&mut connection)
            .await
            .map_err(Error::provider)?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        let mut connection = self.connection.clone();
        let _removed: u64 = redis::cmd("DEL")
            .arg(self.redis_key(key))
            .query_async(&mut connection)
            .await
            .map_err(Error::provider)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let Some(namespace) = &self.namespace else {
            return Err(Error::provider("refusing to clear a redis tier without a namespace"));
        };

        let pattern = format!("{namespace}*");
        let mut connection = self.connection.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut connection)
                .await
                .map_err(Error::provider)?;

            if !keys.is_empty() {
                let _removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut connection)
                    .await
                    .map_err(Error::provider)?;
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}
