//! In-memory backend.
//!
//! Mirrors the store semantics the cache layer relies on: string values,
//! per-key expiry, idempotent deletes and a cursor-based pattern scan. Used
//! by the test suites and for running without a live server.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{Backend, Connector, ScanPage};
use super::entry::CacheEntry;
use super::pattern::pattern_matches;
use crate::config::ConnectionDescriptor;
use crate::error::Result;

#[derive(Debug, Default)]
struct MemoryState {
    /// Key -> (insertion sequence, entry)
    entries: HashMap<String, (u64, CacheEntry)>,
    /// Insertion sequence -> key, the order scans walk in
    order: BTreeMap<u64, String>,
    /// Last sequence handed out; sequences start at 1 so cursor 0 means "start"
    last_seq: u64,
}

impl MemoryState {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some((seq, _)) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    /// Removes `key` if it has expired, returning true when it was removed.
    fn evict_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|(_, entry)| entry.is_expired());
        if expired {
            self.remove(key);
        }
        expired
    }
}

// == Memory Backend ==
/// Thread-safe in-process store.
///
/// Expired entries are dropped lazily when they are read, deleted or scanned.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state
            .entries
            .values()
            .filter(|(_, entry)| !entry.is_expired())
            .count()
    }

    /// Returns true if no live entries remain.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining TTL of `key` in milliseconds; `None` if absent or persistent.
    pub async fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|(_, entry)| !entry.is_expired())
            .and_then(|(_, entry)| entry.ttl_remaining_ms())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        if state.evict_if_expired(key) {
            return Ok(None);
        }
        Ok(state.entries.get(key).map(|(_, entry)| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = CacheEntry::new(value.to_string(), ttl);

        // Overwrites keep their scan position
        if let Some((_, existing)) = state.entries.get_mut(key) {
            *existing = entry;
            return Ok(());
        }

        state.last_seq += 1;
        let seq = state.last_seq;
        state.order.insert(seq, key.to_string());
        state.entries.insert(key.to_string(), (seq, entry));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        if state.evict_if_expired(key) {
            return Ok(0);
        }
        Ok(u64::from(state.remove(key)))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let mut state = self.state.write().await;
        let count = count.max(1);

        let visited: Vec<(u64, String)> = state
            .order
            .range(cursor..)
            .take(count)
            .map(|(seq, key)| (*seq, key.clone()))
            .collect();

        let next_cursor = match visited.last() {
            Some((last, _)) if state.order.range(last + 1..).next().is_some() => last + 1,
            _ => 0,
        };

        let mut keys = Vec::new();
        for (_, key) in visited {
            if state.evict_if_expired(&key) {
                continue;
            }
            if pattern_matches(pattern, &key) {
                keys.push(key);
            }
        }

        Ok(ScanPage {
            cursor: next_cursor,
            keys,
        })
    }
}

/// Connector handing out a fresh [`MemoryBackend`] per descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryConnector;

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _descriptor: &ConnectionDescriptor) -> Result<Arc<dyn Backend>> {
        Ok(Arc::new(MemoryBackend::new()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    async fn scan_all(backend: &MemoryBackend, pattern: &str, count: usize) -> Vec<String> {
        let mut cursor = 0;
        let mut keys = Vec::new();
        loop {
            let page = backend.scan(cursor, pattern, count).await.unwrap();
            keys.extend(page.keys);
            if page.cursor == 0 {
                return keys;
            }
            cursor = page.cursor;
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new();

        backend.set("key1", "\"value1\"", None).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap().as_deref(), Some("\"value1\""));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = MemoryBackend::new();

        backend.set("key1", "1", None).await.unwrap();
        backend.set("key1", "2", None).await.unwrap();

        assert_eq!(backend.get("key1").await.unwrap().as_deref(), Some("2"));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() {
        let backend = MemoryBackend::new();

        backend
            .set("key1", "1", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        backend.set("key1", "2", None).await.unwrap();

        assert_eq!(backend.ttl_remaining_ms("key1").await, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MemoryBackend::new();

        backend.set("key1", "1", None).await.unwrap();

        assert_eq!(backend.delete("key1").await.unwrap(), 1);
        assert_eq!(backend.delete("key1").await.unwrap(), 0);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let backend = MemoryBackend::new();

        backend
            .set("key1", "1", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(backend.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(backend.get("key1").await.unwrap(), None);
        assert_eq!(backend.delete("key1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_matches_pattern_across_pages() {
        let backend = MemoryBackend::new();
        for i in 0..25 {
            backend.set(&format!("pfx:{}", i), "1", None).await.unwrap();
            backend.set(&format!("other:{}", i), "1", None).await.unwrap();
        }

        let mut keys = scan_all(&backend, "pfx:*", 7).await;
        keys.sort();

        assert_eq!(keys.len(), 25);
        assert!(keys.iter().all(|k| k.starts_with("pfx:")));
    }

    #[tokio::test]
    async fn test_scan_survives_deletes_between_pages() {
        let backend = MemoryBackend::new();
        for i in 0..10 {
            backend.set(&format!("k{}", i), "1", None).await.unwrap();
        }

        let mut cursor = 0;
        let mut seen = 0;
        loop {
            let page = backend.scan(cursor, "k*", 3).await.unwrap();
            for key in &page.keys {
                backend.delete(key).await.unwrap();
                seen += 1;
            }
            if page.cursor == 0 {
                break;
            }
            cursor = page.cursor;
        }

        assert_eq!(seen, 10);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_scan_empty_store() {
        let backend = MemoryBackend::new();
        let page = backend.scan(0, "*", 10).await.unwrap();
        assert_eq!(page, ScanPage::default());
    }

    #[tokio::test]
    async fn test_connector_yields_independent_backends() {
        let descriptor = ConnectionDescriptor::parse("localhost,6379,0,0,a", 0).unwrap();
        let first = MemoryConnector.connect(&descriptor).await.unwrap();
        let second = MemoryConnector.connect(&descriptor).await.unwrap();

        first.set("key", "1", None).await.unwrap();

        assert!(first.get("key").await.unwrap().is_some());
        assert!(second.get("key").await.unwrap().is_none());
    }
}
