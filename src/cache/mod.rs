//! Response cache: memoises idempotent upstream responses keyed by a
//! deterministic fingerprint (I4, I5).
//!
//! Entirely new relative to the teacher (no caching module exists in the
//! retrieved source); built in the teacher's general
//! `Arc<RwLock<HashMap<...>>>` concurrency idiom — as used for
//! `LeastConnectionsBalancer`'s connection table — and `ahash::AHashMap`
//! for the lookup table, per the teacher's performance-oriented hashing
//! choice in `utils/route_matcher.rs`.

pub mod fingerprint;

use std::sync::RwLock;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use log::debug;

use crate::context::RequestContext;
use crate::models::gateway_config::CacheConfig;

pub use fingerprint::fingerprint;

const CONTENT_TYPE_ALLOW_PREFIXES: [&str; 4] =
    ["application/json", "text/html", "text/plain", "application/xml"];

/// A stored upstream response, keyed by fingerprint.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

struct CacheEntry {
    response: CachedResponse,
    created_at: Instant,
    last_access: Instant,
    hit_count: u64,
    size_bytes: usize,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Eligibility: only GET/HEAD requests are cached.
pub fn is_cacheable_method(method: &str) -> bool {
    matches!(method.to_uppercase().as_str(), "GET" | "HEAD")
}

/// Eligibility: status in [200,400), Cache-Control not no-cache/no-store,
/// Content-Type on the allow-list.
pub fn is_cacheable_response(status: u16, cache_control: Option<&str>, content_type: Option<&str>) -> bool {
    if !(200..400).contains(&status) {
        return false;
    }
    if let Some(cc) = cache_control {
        let cc = cc.to_lowercase();
        if cc.contains("no-cache") || cc.contains("no-store") {
            return false;
        }
    }
    match content_type {
        Some(ct) => {
            let ct = ct.to_lowercase();
            CONTENT_TYPE_ALLOW_PREFIXES.iter().any(|p| ct.starts_with(p))
        }
        None => false,
    }
}

/// Resolves the TTL to store an entry with: `Cache-Control: max-age` first,
/// else `Expires` (RFC 1123), else the configured default.
pub fn resolve_ttl(cache_control: Option<&str>, expires: Option<&str>, default_ttl: Duration) -> Duration {
    if let Some(cc) = cache_control {
        for directive in cc.split(',') {
            let directive = directive.trim();
            if let Some(secs) = directive.strip_prefix("max-age=") {
                if let Ok(secs) = secs.parse::<u64>() {
                    return Duration::from_secs(secs);
                }
            }
        }
    }
    if let Some(expires) = expires {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(expires) {
            let now = chrono::Utc::now();
            let delta = dt.with_timezone(&chrono::Utc) - now;
            if let Ok(std_delta) = delta.to_std() {
                return std_delta;
            }
            return Duration::from_secs(0);
        }
    }
    default_ttl
}

/// Fingerprint-keyed store with TTL expiry and a combined entry-count/byte
/// cap enforced by least-recently-accessed eviction.
pub struct ResponseCache {
    entries: RwLock<AHashMap<u64, CacheEntry>>,
    max_entries: usize,
    max_bytes: usize,
    default_ttl: Duration,
    total_bytes: std::sync::atomic::AtomicUsize,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            total_bytes: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Serves a cached entry if present and unexpired; a stale read
    /// performs lazy removal and returns a miss (I4).
    pub fn get(&self, key: u64) -> Option<CachedResponse> {
        let mut entries = self.entries.write().expect("cache map poisoned");
        let expired = entries.get(&key).map(|e| e.is_expired()).unwrap_or(false);
        if expired {
            if let Some(entry) = entries.remove(&key) {
                self.total_bytes
                    .fetch_sub(entry.size_bytes, std::sync::atomic::Ordering::Relaxed);
            }
            return None;
        }
        let entry = entries.get_mut(&key)?;
        entry.last_access = Instant::now();
        entry.hit_count += 1;
        Some(entry.response.clone())
    }

    /// Stores `response` under `key`, evicting by LRU first if either cap
    /// would be exceeded (I5).
    pub fn set(&self, key: u64, response: CachedResponse, ttl: Duration) {
        let size_bytes = response.body.len()
            + response
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>();

        let mut entries = self.entries.write().expect("cache map poisoned");

        if let Some(old) = entries.remove(&key) {
            self.total_bytes
                .fetch_sub(old.size_bytes, std::sync::atomic::Ordering::Relaxed);
        }

        while entries.len() >= self.max_entries
            || self.total_bytes.load(std::sync::atomic::Ordering::Relaxed) + size_bytes > self.max_bytes
        {
            let Some((&lru_key, _)) = entries.iter().min_by_key(|(_, e)| e.last_access) else {
                break;
            };
            if let Some(evicted) = entries.remove(&lru_key) {
                self.total_bytes
                    .fetch_sub(evicted.size_bytes, std::sync::atomic::Ordering::Relaxed);
            }
        }

        self.total_bytes
            .fetch_add(size_bytes, std::sync::atomic::Ordering::Relaxed);
        entries.insert(
            key,
            CacheEntry {
                response,
                created_at: Instant::now(),
                last_access: Instant::now(),
                hit_count: 0,
                size_bytes,
                ttl,
            },
        );
    }

    /// Removes every TTL-expired entry. Intended to run on a periodic
    /// `tokio::spawn`ed sweep.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write().expect("cache map poisoned");
        let expired_keys: Vec<u64> = entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| *k)
            .collect();
        let removed = expired_keys.len();
        for key in expired_keys {
            if let Some(entry) = entries.remove(&key) {
                self.total_bytes
                    .fetch_sub(entry.size_bytes, std::sync::atomic::Ordering::Relaxed);
            }
        }
        if removed > 0 {
            debug!("cache sweep removed {removed} expired entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Spawns the periodic TTL sweep task described in SPEC_FULL.md §4.4.
pub async fn run_sweep_loop(cache: std::sync::Arc<ResponseCache>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        cache.sweep_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn set_then_get_returns_stored_value() {
        let cache = ResponseCache::new(&CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        });
        cache.set(1, response("hello"), Duration::from_secs(60));
        let got = cache.get(1).unwrap();
        assert_eq!(got.body, b"hello");
    }

    #[test]
    fn expired_entry_returns_miss_and_is_removed() {
        let cache = ResponseCache::new(&CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        });
        cache.set(1, response("hello"), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(1).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn max_entries_triggers_lru_eviction() {
        let cache = ResponseCache::new(&CacheConfig {
            enabled: true,
            max_entries: 2,
            max_bytes: 1024 * 1024,
            ..CacheConfig::default()
        });
        cache.set(1, response("a"), Duration::from_secs(60));
        cache.set(2, response("b"), Duration::from_secs(60));
        // Touch key 1 so key 2 becomes least-recently-accessed.
        cache.get(1);
        cache.set(3, response("c"), Duration::from_secs(60));
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn eligibility_rejects_no_store() {
        assert!(!is_cacheable_response(200, Some("no-store"), Some("application/json")));
        assert!(is_cacheable_response(200, None, Some("application/json")));
        assert!(!is_cacheable_response(404, None, Some("application/json")));
        assert!(!is_cacheable_response(200, None, Some("application/octet-stream")));
    }

    #[test]
    fn ttl_prefers_max_age_over_expires() {
        let ttl = resolve_ttl(Some("max-age=120"), Some("Sun, 06 Nov 1994 08:49:37 GMT"), Duration::from_secs(30));
        assert_eq!(ttl, Duration::from_secs(120));
    }
}
