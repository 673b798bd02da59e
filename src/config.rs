//! Configuration Module
//!
//! Loads the application name and the numbered connection descriptors from
//! environment variables.

use std::env;

use crate::error::{CacheError, Result};

/// Environment variable holding the key namespace prefix.
pub const APP_NAME_ENV: &str = "APP_NAME";

/// Prefix of the numbered connection variables (`REDIS_CONNECTION_0`, ...).
pub const CONNECTION_ENV_PREFIX: &str = "REDIS_CONNECTION_";

/// Hard cap on the number of connection variables scanned.
pub const MAX_CONNECTIONS: usize = 30;

const DESCRIPTOR_FIELDS: usize = 5;

// == Connection Descriptor ==
/// One parsed `host,port,database,default_ttl_seconds,name` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Numeric suffix of the variable the descriptor came from
    pub index: usize,
    pub host: String,
    pub port: u16,
    /// Logical database selected on connect
    pub database: i64,
    /// Default TTL in seconds, 0 = no expiration
    pub default_ttl: u64,
    /// Unique connection name used for registry lookups
    pub name: String,
}

impl ConnectionDescriptor {
    /// Parses a raw descriptor string.
    ///
    /// # Arguments
    /// * `raw` - The variable value, e.g. `"localhost,6379,0,60,default"`
    /// * `index` - Numeric suffix of the source variable, used in error messages
    ///
    /// Fields past the fifth are ignored. A TTL of zero or below means no
    /// expiration.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` when fewer than 5 fields are present,
    /// when host, port or name is empty, or when a numeric field does not parse.
    pub fn parse(raw: &str, index: usize) -> Result<Self> {
        let context = || format!("[connection: {}, details: '{}']", index, raw);

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if fields.len() < DESCRIPTOR_FIELDS {
            return Err(CacheError::Configuration(format!(
                "expected at least {} comma-separated fields, found {} {}",
                DESCRIPTOR_FIELDS,
                fields.len(),
                context()
            )));
        }

        let (host, port, database, ttl, name) = (fields[0], fields[1], fields[2], fields[3], fields[4]);
        if host.is_empty() || port.is_empty() || name.is_empty() {
            return Err(CacheError::Configuration(format!(
                "host, port and name must not be empty {}",
                context()
            )));
        }

        let port = port.parse::<u16>().map_err(|_| {
            CacheError::Configuration(format!("invalid port '{}' {}", port, context()))
        })?;
        let database = database.parse::<i64>().map_err(|_| {
            CacheError::Configuration(format!("invalid database '{}' {}", database, context()))
        })?;
        let default_ttl = ttl.parse::<i64>().map_err(|_| {
            CacheError::Configuration(format!("invalid expiration '{}' {}", ttl, context()))
        })?;
        let default_ttl = u64::try_from(default_ttl).unwrap_or(0);

        Ok(Self {
            index,
            host: host.to_string(),
            port,
            database,
            default_ttl,
            name: name.to_string(),
        })
    }

    /// Connection URL understood by the redis client.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

// == Config ==
/// Cache layer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Namespace prefix for generated keys
    pub app_name: String,
    /// Descriptors in variable order; index 0 is the default connection
    pub connections: Vec<ConnectionDescriptor>,
}

impl Config {
    /// Creates a new Config by reading the process environment.
    ///
    /// # Environment Variables
    /// - `APP_NAME` - Key namespace prefix (default: empty)
    /// - `REDIS_CONNECTION_0` .. `REDIS_CONNECTION_29` - Connection descriptors;
    ///   scanning stops at the first absent or empty index
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Creates a new Config using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_name = lookup(APP_NAME_ENV).unwrap_or_default();

        let mut connections = Vec::new();
        for index in 0..MAX_CONNECTIONS {
            let raw = match lookup(&format!("{}{}", CONNECTION_ENV_PREFIX, index)) {
                Some(raw) if !raw.trim().is_empty() => raw,
                _ => break,
            };
            connections.push(ConnectionDescriptor::parse(&raw, index)?);
        }

        Ok(Self {
            app_name,
            connections,
        })
    }
}
