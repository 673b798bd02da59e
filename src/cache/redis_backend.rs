//! Redis backend.
//!
//! Wraps a `redis::aio::MultiplexedConnection`: commands share one socket,
//! each call is a single attempt and a dropped connection is not re-opened.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::backend::{Backend, Connector, ScanPage};
use crate::config::ConnectionDescriptor;
use crate::error::Result;

/// Redis connection bound to one logical database.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
    url: String,
}

impl RedisBackend {
    /// Opens a connection for `descriptor`, selecting its database.
    ///
    /// # Errors
    /// Returns `CacheError::Connectivity` if the server cannot be reached.
    /// The connect is attempted once.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let url = descriptor.url();
        let client = redis::Client::open(url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn, url })
    }

    /// Returns a clone of the underlying connection for commands not covered here.
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend").field("url", &self.url).finish()
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds).await?;
            }
            None => {
                conn.set::<_, _, ()>(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let mut conn = self.conn.clone();
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok(ScanPage { cursor, keys })
    }
}

/// Connector that opens a [`RedisBackend`] per descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl Connector for RedisConnector {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn Backend>> {
        let backend = RedisBackend::connect(descriptor).await?;
        Ok(Arc::new(backend))
    }
}
