//! Cache for rendered role and skill sections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheConfig;

/// What a cached section describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Role(String),
    Skill(String),
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
    sequence: u64,
}

/// Counters reported by [`ContextCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded cache of graph sections, keyed by role or skill name.
///
/// When full, the oldest entry is evicted. With a TTL, entries older than
/// the TTL are treated as missing. A cache with `max_entries == 0` stores
/// nothing.
#[derive(Debug)]
pub struct ContextCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
    ttl: Option<Duration>,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContextCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            ttl: None,
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let cache = Self::new(config.max_entries);
        match config.ttl_secs {
            Some(secs) => cache.with_ttl(Duration::from_secs(secs)),
            None => cache,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let found = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .map(|entry| (entry.value.clone(), self.is_expired(entry)))
        };

        match found {
            Some((value, false)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Some((_, true)) => {
                self.entries.write().await.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry {key:?} expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn put(&self, key: CacheKey, value: String) {
        if self.max_entries == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
                debug!("Evicted {oldest:?} from context cache");
            }
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                sequence,
            },
        );
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
