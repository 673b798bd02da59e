//! Cache Entry Module
//!
//! Raw encoded value held by the in-memory backend, with optional expiry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single stored value with expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The encoded value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The encoded value to store
    /// * `ttl` - Optional time to live; `None` never expires
    ///
    /// A TTL too large to represent as a Unix millisecond timestamp never expires.
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|ttl| {
            u64::try_from(ttl.as_millis())
                .ok()
                .and_then(|ms| current_timestamp_ms().checked_add(ms))
        });
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        let now = current_timestamp_ms();
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("\"value\"".to_string(), None);

        assert_eq!(entry.value, "\"value\"");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_secs(10)));

        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining_ms().unwrap();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_millis(50)));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_entry_huge_ttl_never_expires() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_secs(u64::MAX)));

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_ttl_overflowing_timestamp_never_expires() {
        let entry = CacheEntry::new("1".to_string(), Some(Duration::from_millis(u64::MAX - 1)));

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: "1".to_string(),
            expires_at: Some(now),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }
}
