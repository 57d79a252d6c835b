/// Balance Cache - short-lived RPC result cache
///
/// Holds successful balance reads per `(chain, address, asset)` for a fixed
/// TTL so repeated portfolio renders do not hammer chain RPC endpoints.
/// Failed reads are never stored.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

use super::BalanceKey;

/// Default time-to-live of a cached balance
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    balance: f64,
    fetched_at: Instant,
}

pub struct BalanceCache {
    entries: RwLock<HashMap<BalanceKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BalanceCache {
    pub fn new(ttl: Duration) -> Self {
        log::debug!("Initializing balance cache (ttl {:?})", ttl);
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached balance if still within the TTL window
    pub fn get(&self, key: &BalanceKey) -> Option<f64> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        match entries.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Balance cache hit for {}", key);
                Some(entry.balance)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: BalanceKey, balance: f64) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(
            key,
            CacheEntry {
                balance,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &BalanceKey) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.remove(key).is_some()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        let purged = before - entries.len();
        if purged > 0 {
            log::debug!("Purged {} expired balance(s)", purged);
        }
        purged
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        let expired = entries
            .values()
            .filter(|entry| entry.fetched_at.elapsed() >= self.ttl)
            .count();

        CacheStats {
            total_cached: entries.len(),
            expired,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_cached: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
}
