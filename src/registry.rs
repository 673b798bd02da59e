//! Connection Registry
//!
//! Opens one store handle per configured connection and forwards the
//! single-connection API to the default (first) handle.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

use crate::cache::{Connector, RedisConnector, StoreHandle};
use crate::config::{Config, ConnectionDescriptor};
use crate::error::{CacheError, Result};
use crate::keys::KeyBuilder;

// == Registry ==
/// Name-to-handle mapping built once at startup.
///
/// Never mutated after construction; clone it (cheap) or share it behind an
/// `Arc` to hand it to consumers.
#[derive(Debug, Clone)]
pub struct Registry {
    handles: HashMap<String, Arc<StoreHandle>>,
    default: Arc<StoreHandle>,
    keys: KeyBuilder,
}

impl Registry {
    /// Connects to every configured Redis connection.
    ///
    /// # Errors
    /// See [`connect_with`](Self::connect_with).
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_with(config, &RedisConnector).await
    }

    /// Connects every descriptor in order using `connector`.
    ///
    /// Each new connection is pinged before it is registered. The first
    /// descriptor becomes the default handle.
    ///
    /// # Errors
    /// - `CacheError::Configuration` if no connection is configured or two
    ///   connections share a name
    /// - `CacheError::Connectivity` if a connection cannot be opened or pinged
    pub async fn connect_with(config: &Config, connector: &dyn Connector) -> Result<Self> {
        if config.connections.is_empty() {
            error!(app = %config.app_name, "no cache connection configured");
            return Err(CacheError::Configuration(
                "no connection configured, set REDIS_CONNECTION_0".to_string(),
            ));
        }

        let mut handles: HashMap<String, Arc<StoreHandle>> = HashMap::new();
        let mut default = None;

        for descriptor in &config.connections {
            if handles.contains_key(&descriptor.name) {
                error!(
                    app = %config.app_name,
                    connection = descriptor.index,
                    name = %descriptor.name,
                    "duplicate cache connection name"
                );
                return Err(CacheError::Configuration(format!(
                    "duplicate connection name '{}' [connection: {}]",
                    descriptor.name, descriptor.index
                )));
            }

            let handle = Arc::new(Self::open(&config.app_name, descriptor, connector).await?);
            if default.is_none() {
                default = Some(handle.clone());
            }
            handles.insert(descriptor.name.clone(), handle);
        }

        let default = default.ok_or_else(|| {
            CacheError::Configuration("no default connection registered".to_string())
        })?;

        Ok(Self {
            handles,
            default,
            keys: KeyBuilder::new(config.app_name.clone()),
        })
    }

    async fn open(
        app_name: &str,
        descriptor: &ConnectionDescriptor,
        connector: &dyn Connector,
    ) -> Result<StoreHandle> {
        let backend = connector.connect(descriptor).await.map_err(|err| {
            error!(
                app = %app_name,
                connection = descriptor.index,
                name = %descriptor.name,
                error = %err,
                "cache connection was not started"
            );
            startup_connectivity_error(descriptor, err)
        })?;

        let handle = StoreHandle::new(descriptor, backend);
        handle.ping().await.map_err(|err| {
            error!(
                app = %app_name,
                connection = descriptor.index,
                name = %descriptor.name,
                error = %err,
                "cache connection did not answer ping"
            );
            startup_connectivity_error(descriptor, err)
        })?;

        info!(
            app = %app_name,
            connection = descriptor.index,
            name = %descriptor.name,
            host = %descriptor.host,
            port = descriptor.port,
            database = descriptor.database,
            default_ttl = descriptor.default_ttl,
            "cache connection started"
        );
        Ok(handle)
    }

    // == Lookup ==
    /// Returns the handle registered under `name`.
    pub fn handle(&self, name: &str) -> Option<&StoreHandle> {
        self.handles.get(name).map(Arc::as_ref)
    }

    /// Returns the default handle (the first configured connection).
    pub fn default_handle(&self) -> &StoreHandle {
        &self.default
    }

    /// Registered connection names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Key builder bound to the configured application name.
    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    // == Default-Connection Facade ==
    pub async fn ping(&self) -> Result<()> {
        self.default.ping().await
    }

    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.default.set(key, value).await
    }

    pub async fn set_with_ttl<T>(&self, key: &str, value: &T, ttl_seconds: u64) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.default.set_with_ttl(key, value, ttl_seconds).await
    }

    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.default.get(key).await
    }

    pub async fn delete(&self, key_or_pattern: &str) -> Result<u64> {
        self.default.delete(key_or_pattern).await
    }
}

/// Startup failures are reported as connectivity errors naming the connection.
fn startup_connectivity_error(descriptor: &ConnectionDescriptor, err: CacheError) -> CacheError {
    let detail = match err {
        CacheError::Connectivity(msg) | CacheError::Store(msg) => msg,
        other => other.to_string(),
    };
    CacheError::Connectivity(format!(
        "connection '{}' [{}:{}/{}] unavailable: {}",
        descriptor.name, descriptor.host, descriptor.port, descriptor.database, detail
    ))
}
