//! Cache Module
//!
//! Store handles and the backends they run on.

mod backend;
mod entry;
mod handle;
mod memory;
mod pattern;
mod redis_backend;


// Re-export public types
pub use backend::{Backend, Connector, ScanPage};
pub use handle::{StoreHandle, SCAN_BATCH_SIZE};
pub use memory::{MemoryBackend, MemoryConnector};
pub use pattern::{is_pattern, pattern_matches, WILDCARD};
pub use redis_backend::{RedisBackend, RedisConnector};
