//! In-process response cache with per-entry TTL.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::keys::KeyPattern;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "fortview_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "fortview_cache_miss_total";
pub const METRIC_CACHE_SET: &str = "fortview_cache_set_total";
pub const METRIC_CACHE_INVALIDATED: &str = "fortview_cache_invalidated_total";
pub const METRIC_CACHE_EXPIRED: &str = "fortview_cache_expired_total";

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: OffsetDateTime,
}

impl CacheEntry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Best-effort memoization of read responses.
///
/// Nothing here ever fails toward the caller: a broken entry reads as a miss and a
/// rejected write is dropped with a warning.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        {
            let entries = rw_read(&self.entries, SOURCE, "get");
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    counter!(METRIC_CACHE_MISS).increment(1);
                    return None;
                }
            }
        }

        let mut entries = rw_write(&self.entries, SOURCE, "get.evict");
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
            counter!(METRIC_CACHE_EXPIRED).increment(1);
        }
        counter!(METRIC_CACHE_MISS).increment(1);
        None
    }

    /// Typed read. A value that no longer decodes is evicted and reported as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(
                    target = "fortview::cache",
                    key,
                    error = %err,
                    "Discarding cache entry that failed to decode"
                );
                self.delete(key);
                None
            }
        }
    }

    /// Stores `value` until `ttl_seconds` from now. A zero TTL is ignored.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl_seconds: u64) {
        let key = key.into();
        if ttl_seconds == 0 {
            warn!(
                target = "fortview::cache",
                key = %key,
                "Ignoring cache write with zero TTL"
            );
            return;
        }

        let Some(expires_at) = self
            .clock
            .now()
            .checked_add(time::Duration::seconds(ttl_seconds.min(i64::MAX as u64) as i64))
        else {
            warn!(
                target = "fortview::cache",
                key = %key,
                ttl_seconds,
                "Ignoring cache write with out-of-range TTL"
            );
            return;
        };

        rw_write(&self.entries, SOURCE, "set").insert(key, CacheEntry { value, expires_at });
        counter!(METRIC_CACHE_SET).increment(1);
    }

    pub fn set_json<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl_seconds: u64) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl_seconds),
            Err(err) => warn!(
                target = "fortview::cache",
                key = %key,
                error = %err,
                "Skipping cache write for unserializable value"
            ),
        }
    }

    pub fn delete(&self, key: &str) {
        if rw_write(&self.entries, SOURCE, "delete").remove(key).is_some() {
            counter!(METRIC_CACHE_INVALIDATED).increment(1);
        }
    }

    /// Removes every key matching a `*` wildcard pattern; returns how many went.
    pub fn delete_pattern(&self, pattern: &str) -> usize {
        let pattern = match KeyPattern::new(pattern) {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(
                    target = "fortview::cache",
                    pattern,
                    error = %err,
                    "Ignoring invalid cache pattern"
                );
                return 0;
            }
        };

        let mut entries = rw_write(&self.entries, SOURCE, "delete_pattern");
        let before = entries.len();
        entries.retain(|key, _| !pattern.matches(key));
        let removed = before - entries.len();
        drop(entries);

        counter!(METRIC_CACHE_INVALIDATED).increment(removed as u64);
        debug!(target = "fortview::cache", removed, "Invalidated cache pattern");
        removed
    }

    /// Evicts every entry whose expiry has passed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "sweep_expired");
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        drop(entries);

        counter!(METRIC_CACHE_EXPIRED).increment(removed as u64);
        removed
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a live entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entries = rw_read(&self.entries, SOURCE, "ttl_remaining");
        let entry = entries.get(key).filter(|entry| entry.is_live(now))?;
        (entry.expires_at - now).try_into().ok()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache() -> (Arc<ManualClock>, ResponseCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = ResponseCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (clock, cache) = cache();
        cache.set("events:items", json!({ "items": [] }), 60);
        assert_eq!(cache.get("events:items"), Some(json!({ "items": [] })));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("events:items").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("events:items").is_none());
        assert!(cache.is_empty(), "expired entry is evicted on read");
    }

    #[test]
    fn set_overwrites_and_delete_is_idempotent() {
        let (_, cache) = cache();
        cache.set("k", json!(1), 10);
        cache.set("k", json!(2), 10);
        assert_eq!(cache.get("k"), Some(json!(2)));

        cache.delete("k");
        cache.delete("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn zero_ttl_is_not_stored() {
        let (_, cache) = cache();
        cache.set("k", json!(true), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn delete_pattern_removes_only_matching_prefix() {
        let (_, cache) = cache();
        for key in ["foo", "foo:items:page:1", "food:items", "bar:foo"] {
            cache.set(key, json!(key), 60);
        }

        let removed = cache.delete_pattern("foo:*");
        assert_eq!(removed, 1);
        assert!(cache.get("foo").is_some());

        let removed = cache.delete_pattern("foo*");
        assert_eq!(removed, 2);
        assert!(cache.get("bar:foo").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let (clock, cache) = cache();
        cache.set("short", json!(1), 5);
        cache.set("long", json!(2), 500);

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").is_some());
    }

    #[test]
    fn undecodable_entries_read_as_miss() {
        let (_, cache) = cache();
        cache.set("k", json!("not a number"), 60);
        assert_eq!(cache.get_json::<u32>("k"), None);
        assert!(cache.is_empty());

        cache.set_json("n", &7_u32, 60);
        assert_eq!(cache.get_json::<u32>("n"), Some(7));
    }

    #[test]
    fn ttl_remaining_counts_down() {
        let (clock, cache) = cache();
        cache.set("k", json!(1), 30);
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.ttl_remaining("k"), Some(Duration::from_secs(20)));
    }
}
