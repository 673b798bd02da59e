//! Multi Cache - A multi-connection Redis cache helper
//!
//! Reads connection descriptors from the environment, opens one store
//! connection per descriptor and exposes typed JSON `set`/`get`/`delete`
//! with pattern deletion. The first connection doubles as the default.

pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod registry;

pub use cache::StoreHandle;
pub use config::{Config, ConnectionDescriptor};
pub use error::{CacheError, Result};
pub use keys::{hash, KeyBuilder};
pub use registry::Registry;
