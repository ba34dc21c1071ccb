//! Redis-backed key-value store
//!
//! Values are written with `PSETEX` so expiry is enforced by the server.
//! Prefix scans use cursor-based `SCAN MATCH` rather than `KEYS` so clearing a
//! namespace does not block the server.

use super::KeyValueStore;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

/// Keys requested per `SCAN` round trip
const SCAN_COUNT: usize = 500;

/// Keys removed per `DEL` command
const DELETE_BATCH: usize = 500;

/// Upper bound on a single connection attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Reconnect attempts before a connection error is surfaced
const CONNECT_RETRIES: usize = 2;

/// Redis store sharing one multiplexed, auto-reconnecting connection
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `url` - connection string, e.g. `redis://:password@localhost:6379/0`
    ///
    /// A malformed URL is a configuration error; a server that cannot be
    /// reached is a store error, reported after a bounded number of attempts.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)
            .map_err(|e| CacheError::Config(format!("invalid Redis URL: {e}")))?;

        info!("Connecting to Redis at {}", redact(url));

        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_connection_timeout(CONNECT_TIMEOUT);

        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| CacheError::Store(format!("failed to connect to Redis: {e}")))?;

        info!("Successfully connected to Redis");
        Ok(Self { conn })
    }

    /// Round-trip `PING` to confirm the server is reachable
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Hide the password component of a connection string for logging
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        debug!("GET {} -> {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();

        if ttl.is_zero() {
            let _: () = conn.del(key).await?;
            debug!("DEL {} (zero TTL)", key);
            return Ok(());
        }

        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = conn.pset_ex(key, value, millis).await?;
        debug!("PSETEX {} {}ms", key, millis);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let keys = self.scan_keys(prefix).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let mut pairs = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(SCAN_COUNT) {
            let values: Vec<Option<String>> = ::redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await?;

            // keys may expire between SCAN and MGET
            pairs.extend(
                chunk
                    .iter()
                    .zip(values)
                    .filter_map(|(key, value)| value.map(|v| (key.clone(), v))),
            );
        }

        debug!("SCAN {}* -> {} live keys", prefix, pairs.len());
        Ok(pairs)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.scan_keys(prefix).await?;
        let mut conn = self.conn.clone();
        let mut removed = 0;

        for chunk in keys.chunks(DELETE_BATCH) {
            let count: usize = ::redis::cmd("DEL").arg(chunk).query_async(&mut conn).await?;
            removed += count;
        }

        info!("Deleted {} keys under prefix {}", removed, prefix);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_password() {
        assert_eq!(
            redact("redis://:hunter2@cache.internal:6379/0"),
            "redis://***@cache.internal:6379/0"
        );
        assert_eq!(redact("redis://localhost:6379"), "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = RedisStore::connect("not a url").await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
