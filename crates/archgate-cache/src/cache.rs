//! Architecture cache with per-entry TTL.
//!
//! Entries live in a [`DashMap`], so concurrent scheduling decisions only
//! contend when they touch the same shard. There is no global lock.
//!
//! Cache statistics (hits, misses, evictions) are kept in atomics and
//! emitted as `tracing::debug` fields on every lookup.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use archgate_core::{Architecture, ArchitectureRecord};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

/// Configuration for the architecture cache.
#[derive(Clone, Debug)]
pub struct ArchCacheConfig {
    /// Time-to-live for cache entries (default: 10 minutes).
    pub ttl: Duration,
}

impl Default for ArchCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

struct CacheEntry {
    record: ArchitectureRecord,
    /// Absolute deadline stamped at insertion. `None` when now + TTL is
    /// past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they expired (on read or by the sweeper).
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Image reference → [`ArchitectureRecord`] with lazy TTL expiry.
///
/// At most one record exists per image reference. A `put` followed by a
/// `get` of the same key from any thread observes the written record until
/// it expires. Nothing is guaranteed across keys.
pub struct ArchCache {
    entries: DashMap<String, CacheEntry>,
    config: ArchCacheConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ArchCache {
    /// Create a cache driven by the system clock.
    pub fn new(config: ArchCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache driven by an explicit clock.
    pub fn with_clock(config: ArchCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Look up an image. Returns `None` when absent or expired.
    ///
    /// An expired entry is removed on the way out, unless a concurrent
    /// `put` already replaced it with a fresh one.
    pub fn get(&self, image: &str) -> Option<ArchitectureRecord> {
        let now = self.clock.now();

        // Clone out and release the shard guard before any removal.
        let lookup = self
            .entries
            .get(image)
            .map(|entry| (entry.is_expired(now), entry.record.clone()));

        match lookup {
            Some((false, record)) => {
                let hits = self.counters.hits.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    %image,
                    architectures = ?record.architectures,
                    cache_hits = hits,
                    "arch cache hit"
                );
                Some(record)
            }
            Some((true, _)) => {
                if self
                    .entries
                    .remove_if(image, |_, entry| entry.is_expired(now))
                    .is_some()
                {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                }
                let misses = self.counters.misses.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(%image, cache_misses = misses, "arch cache miss (expired)");
                None
            }
            None => {
                let misses = self.counters.misses.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(%image, cache_misses = misses, "arch cache miss");
                None
            }
        }
    }

    /// Insert or replace the record for `image`, stamping expiry = now + TTL.
    pub fn put(&self, image: &str, architectures: Vec<Architecture>) {
        let expires_at = self.clock.now().checked_add(self.config.ttl);
        debug!(%image, ?architectures, "arch cache put");
        self.entries.insert(
            image.to_string(),
            CacheEntry {
                record: ArchitectureRecord::new(image, architectures),
                expires_at,
            },
        );
    }

    /// Remove the record for `image`. No-op if absent.
    pub fn delete(&self, image: &str) {
        if self.entries.remove(image).is_some() {
            debug!(%image, "arch cache delete");
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.counters
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Periodically purge expired entries until `shutdown` flips.
    pub async fn run_sweeper(
        &self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(interval_secs = interval.as_secs(), "arch cache sweeper started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        debug!(removed, remaining = self.len(), "arch cache sweep");
                    }
                }
                _ = shutdown.changed() => {
                    info!("arch cache sweeper shutting down");
                    break;
                }
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ArchCache {
    fn default() -> Self {
        Self::new(ArchCacheConfig::default())
    }
}
