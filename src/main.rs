//! Multi Cache - walkthrough of the cache helper against live connections.
//!
//! Reads `APP_NAME` and `REDIS_CONNECTION_*` (a `.env` file is honored),
//! connects every descriptor and exercises set/get/delete on the default
//! connection and, when configured, on the `test_a` connection.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multi_cache::{Config, Registry, StoreHandle};

const SECONDARY_CONNECTION: &str = "test_a";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sample {
    code: i32,
    description: String,
}

/// Main entry point.
///
/// # Startup Sequence
/// 1. Load `.env` if present
/// 2. Initialize tracing subscriber for logging
/// 3. Parse configuration from environment variables
/// 4. Connect and ping every configured connection
///
/// Any startup failure ends the process with a non-zero status.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multi_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(message) = dotenv_warning(&dotenv) {
        warn!("{}", message);
    }

    let config = Config::from_env().context("invalid cache configuration")?;
    info!(
        "Configuration loaded: app={}, connections={}",
        config.app_name,
        config.connections.len()
    );

    let registry = Registry::connect(&config)
        .await
        .context("cache was not started")?;

    registry.ping().await.context("default connection offline")?;

    info!("Single database: default connection '{}'", registry.default_handle().name());
    walkthrough(registry.default_handle()).await?;

    match registry.handle(SECONDARY_CONNECTION) {
        Some(handle) => {
            info!("Multiple databases: connection '{}'", handle.name());
            walkthrough(handle).await?;
        }
        None => warn!("Connection '{}' not configured, skipping", SECONDARY_CONNECTION),
    }

    let key = registry
        .keys()
        .prepare_key("samples", Some(&Sample::default()), true)?;
    info!("Prepared key: {}", key);

    info!("Walkthrough finished");
    Ok(())
}

/// Describes a `.env` load failure worth reporting.
///
/// A missing file is expected and yields `None`.
fn dotenv_warning(result: &Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Err(err) if !err.not_found() => Some(format!("Ignoring .env file: {}", err)),
        _ => None,
    }
}

async fn walkthrough(handle: &StoreHandle) -> anyhow::Result<()> {
    let missing: Option<String> = handle.get("my-key-x").await?;
    info!("Checking 'my-key-x': {:?}", missing);

    let sample = Sample {
        code: 1234,
        description: "Test of Structs".to_string(),
    };
    handle.set("key1", "my-value-1").await?;
    handle.set_with_ttl("key2", &123456, 60).await?;
    handle.set("key3", &sample).await?;

    let value1: Option<String> = handle.get("key1").await?;
    let value2: Option<i64> = handle.get("key2").await?;
    let value3: Option<Sample> = handle.get("key3").await?;
    info!(
        "Returned values: [key1: {:?}, key2: {:?}, key3: {:?}]",
        value1, value2, value3
    );

    handle.delete("key2").await?;
    let value2: Option<i64> = handle.get("key2").await?;
    info!("After deleting 'key2': {:?}", value2);

    let removed = handle.delete("key*").await?;
    let value1: Option<String> = handle.get("key1").await?;
    let value3: Option<Sample> = handle.get("key3").await?;
    info!(
        "Deleted {} keys by pattern 'key*': [key1: {:?}, key3: {:?}]",
        removed, value1, value3
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_dotenv_is_silent() {
        let result = Err(dotenvy::Error::Io(io::Error::from(io::ErrorKind::NotFound)));
        assert!(dotenv_warning(&result).is_none());
    }

    #[test]
    fn test_loaded_dotenv_is_silent() {
        let result = Ok(PathBuf::from(".env"));
        assert!(dotenv_warning(&result).is_none());
    }

    #[test]
    fn test_malformed_dotenv_is_reported() {
        let result = Err(dotenvy::Error::LineParse("KEY='unterminated".to_string(), 4));
        let message = dotenv_warning(&result).unwrap();
        assert!(message.starts_with("Ignoring .env file"));
    }

    #[test]
    fn test_unreadable_dotenv_is_reported() {
        let result = Err(dotenvy::Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(dotenv_warning(&result).is_some());
    }
}
