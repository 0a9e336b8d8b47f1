//! In-memory cache with lazy time-to-live expiry.
//!
//! Entries are never swept; an expired entry is dropped when a read finds it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Time source, injectable so expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
  fn now(&self) -> Instant {
    (**self).now()
  }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
  start: Instant,
  offset: Mutex<Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self { start: Instant::now(), offset: Mutex::new(Duration::ZERO) }
  }

  pub fn advance(&self, by: Duration) {
    if let Ok(mut offset) = self.offset.lock() {
      *offset += by;
    }
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
    self.start + offset
  }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  inserted_at: Instant,
}

/// Cache keyed by strings such as `video:<id>` or `playlistVideos:<id>:<max>`.
#[derive(Debug)]
pub struct TtlCache<V> {
  ttl: Duration,
  entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, entries: Mutex::new(HashMap::new()) }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Live value for `key`, or `None` if absent or older than the TTL.
  pub fn get(&self, key: &str, now: Instant) -> Option<V> {
    let mut entries = self.entries.lock().ok()?;
    match entries.get(key) {
      Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
        debug!(key, "cache: hit");
        Some(entry.value.clone())
      }
      Some(_) => {
        debug!(key, "cache: expired");
        entries.remove(key);
        None
      }
      None => {
        debug!(key, "cache: miss");
        None
      }
    }
  }

  pub fn insert(&self, key: impl Into<String>, value: V, now: Instant) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(key.into(), CacheEntry { value, inserted_at: now });
    }
  }

  pub fn clear(&self) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }

  /// Number of stored entries, expired or not.
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn live_entry_is_returned() {
    let clock = ManualClock::new();
    let cache = TtlCache::new(Duration::from_secs(60));
    cache.insert("video:a", 1u32, clock.now());
    clock.advance(Duration::from_secs(59));
    assert_eq!(cache.get("video:a", clock.now()), Some(1));
  }

  #[test]
  fn expired_entry_is_absent_and_dropped() {
    let clock = ManualClock::new();
    let cache = TtlCache::new(Duration::from_secs(60));
    cache.insert("video:a", 1u32, clock.now());
    clock.advance(Duration::from_secs(60));
    assert_eq!(cache.get("video:a", clock.now()), None);
    assert!(cache.is_empty());
  }

  #[test]
  fn expired_entries_linger_until_read() {
    let clock = ManualClock::new();
    let cache = TtlCache::new(Duration::from_secs(1));
    cache.insert("a", "x".to_string(), clock.now());
    clock.advance(Duration::from_secs(5));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn reinsert_refreshes_timestamp() {
    let clock = ManualClock::new();
    let cache = TtlCache::new(Duration::from_secs(10));
    cache.insert("k", 1u32, clock.now());
    clock.advance(Duration::from_secs(8));
    cache.insert("k", 2u32, clock.now());
    clock.advance(Duration::from_secs(8));
    assert_eq!(cache.get("k", clock.now()), Some(2));
  }

  #[test]
  fn clear_removes_everything() {
    let cache = TtlCache::new(Duration::from_secs(10));
    cache.insert("a", 1u32, Instant::now());
    cache.insert("b", 2u32, Instant::now());
    cache.clear();
    assert!(cache.is_empty());
  }
}
