//! Store client boundary.
//!
//! Everything a [`StoreHandle`](super::StoreHandle) needs from a key-value
//! store: raw string reads and writes, single-key deletes, liveness and an
//! incremental pattern scan.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConnectionDescriptor;
use crate::error::Result;

/// One page of an incremental scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; 0 when the iteration is complete
    pub cursor: u64,
    /// Keys returned by this call
    pub keys: Vec<String>,
}

/// Raw operations against one store connection.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Reads the raw value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` at `key`, overwriting. `None` means no expiration.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Deletes `key`, returning the number of keys removed (0 or 1).
    async fn delete(&self, key: &str) -> Result<u64>;

    /// Returns one page of keys matching `pattern`, starting at `cursor`.
    ///
    /// A scan starts at cursor 0 and ends when the returned cursor is 0.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;
}

/// Opens a backend for a connection descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Arc<dyn Backend>>;
}
