//! Store Handle Module
//!
//! Typed JSON operations bound to one connection and its default TTL.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::backend::Backend;
use super::pattern::is_pattern;
use crate::config::ConnectionDescriptor;
use crate::error::{CacheError, Result};

/// Keys requested per SCAN round-trip during a pattern delete.
pub const SCAN_BATCH_SIZE: usize = 100;

// == Store Handle ==
/// One named connection with its database and default TTL.
///
/// Immutable after construction; share it behind an `Arc` across tasks.
#[derive(Clone)]
pub struct StoreHandle {
    backend: Arc<dyn Backend>,
    host: String,
    port: u16,
    database: i64,
    /// Default TTL in seconds, 0 = no expiration
    default_ttl: u64,
    name: String,
}

impl StoreHandle {
    // == Constructor ==
    /// Binds `backend` to the settings of `descriptor`.
    pub fn new(descriptor: &ConnectionDescriptor, backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            host: descriptor.host.clone(),
            port: descriptor.port,
            database: descriptor.database,
            default_ttl: descriptor.default_ttl,
            name: descriptor.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> i64 {
        self.database
    }

    /// Default TTL in seconds applied by [`set`](Self::set); 0 = no expiration.
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// The underlying backend, for operations this handle does not wrap.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    // == Ping ==
    /// Liveness probe against the connection.
    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    // == Set With TTL ==
    /// Stores `value` as JSON at `key`, expiring after `ttl_seconds`.
    ///
    /// A TTL of 0 stores the value without expiration. Existing values are
    /// overwritten.
    ///
    /// # Errors
    /// Returns `CacheError::Serialization` if `value` cannot be encoded.
    pub async fn set_with_ttl<T>(&self, key: &str, value: &T, ttl_seconds: u64) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value).map_err(|err| {
            debug!(key, error = %err, "failed to encode cache value");
            CacheError::Serialization(format!("cannot encode value for key '{}': {}", key, err))
        })?;

        let ttl = (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds));
        self.backend.set(key, &encoded, ttl).await
    }

    // == Set ==
    /// Stores `value` at `key` with the handle's default TTL.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    // == Get ==
    /// Reads and decodes the value at `key`.
    ///
    /// Returns `Ok(None)` on a cache miss.
    ///
    /// # Errors
    /// Returns `CacheError::Serialization` when the stored JSON does not fit `T`.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let raw = match self.backend.get(key).await? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };

        serde_json::from_str(&raw).map(Some).map_err(|err| {
            debug!(key, error = %err, "failed to decode cache value");
            CacheError::Serialization(format!("cannot decode value for key '{}': {}", key, err))
        })
    }

    // == Delete ==
    /// Deletes an exact key, or every key matching a `*` pattern.
    ///
    /// Pattern deletes walk the keyspace with an incremental scan and delete
    /// keys one at a time. The operation is not atomic: if the scan fails,
    /// keys already removed stay removed.
    ///
    /// Returns the number of keys removed. Deleting an absent key returns 0.
    pub async fn delete(&self, key_or_pattern: &str) -> Result<u64> {
        if !is_pattern(key_or_pattern) {
            debug!(connection = %self.name, key = key_or_pattern, "deleting key");
            return self.backend.delete(key_or_pattern).await;
        }

        let mut removed = 0;
        let mut cursor = 0;
        loop {
            let page = self
                .backend
                .scan(cursor, key_or_pattern, SCAN_BATCH_SIZE)
                .await
                .map_err(|err| {
                    debug!(
                        connection = %self.name,
                        pattern = key_or_pattern,
                        removed,
                        error = %err,
                        "pattern delete aborted"
                    );
                    err
                })?;

            for key in &page.keys {
                debug!(connection = %self.name, key = %key, "deleting key");
                removed += self.backend.delete(key).await?;
            }

            if page.cursor == 0 {
                break;
            }
            cursor = page.cursor;
        }

        debug!(connection = %self.name, pattern = key_or_pattern, removed, "pattern delete complete");
        Ok(removed)
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
