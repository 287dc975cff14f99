//! Namespace-scoped cache with per-entry expiry.
//!
//! Entries are keyed by `"<namespace>:<key>"`. Invalidating a namespace
//! drops its entries and those of every descendant namespace, so a change
//! high in the tree flushes everything computed beneath it.
//!
//! Every invalidation also advances a generation counter. A value computed
//! before an invalidation is stored with [`NamespacedCache::set_if_current`],
//! which refuses it once the generation has moved on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use warrant_permissions::namespace::{self, ROOT};
use warrant_store::{ChangeKind, NamespaceChange};

struct CacheEntry<V> {
    namespace: String,
    value: V,
    /// `None` when the lifetime overflows `Instant`.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A concurrent cache whose entries belong to namespaces.
pub struct NamespacedCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    max_size: usize,
    invalidate_on_authorization: bool,
    generation: AtomicU64,
}

impl<V> std::fmt::Debug for NamespacedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedCache")
            .field("len", &self.entries.len())
            .field("max_size", &self.max_size)
            .field("invalidate_on_authorization", &self.invalidate_on_authorization)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl<V: Clone> NamespacedCache<V> {
    /// Create a cache holding at most `max_size` entries.
    ///
    /// Policy changes invalidate the owning namespace by default.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_size: max_size.max(1),
            invalidate_on_authorization: true,
            generation: AtomicU64::new(0),
        }
    }

    /// Choose whether policy changes, not only namespace changes,
    /// invalidate entries.
    #[must_use]
    pub fn with_authorization_invalidation(mut self, enabled: bool) -> Self {
        self.invalidate_on_authorization = enabled;
        self
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    /// Look up a live entry.
    ///
    /// An expired entry is removed and reported as missing.
    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        let full_key = Self::full_key(namespace, key);
        let now = Instant::now();

        // The shard guard must be released before removing.
        {
            let entry = self.entries.get(&full_key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }

        self.entries
            .remove_if(&full_key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store `value` for `ttl`.
    ///
    /// When the cache is full, expired entries are purged first, then the
    /// entries closest to expiry are evicted.
    pub fn set(&self, namespace: &str, key: &str, value: V, ttl: Duration) {
        let full_key = Self::full_key(namespace, key);

        if !self.entries.contains_key(&full_key) && self.entries.len() >= self.max_size {
            self.make_room();
        }

        self.entries.insert(
            full_key,
            CacheEntry {
                namespace: namespace.to_string(),
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    /// Store `value` unless the cache was invalidated since `generation`
    /// was read. Returns whether the value was kept.
    ///
    /// The generation is checked again after the insert, so an
    /// invalidation racing with the write still removes it.
    pub fn set_if_current(
        &self,
        namespace: &str,
        key: &str,
        value: V,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        if self.generation() != generation {
            return false;
        }

        self.set(namespace, key, value, ttl);

        if self.generation() != generation {
            self.delete(namespace, key);
            return false;
        }
        true
    }

    /// Current invalidation generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let excess = self
            .entries
            .len()
            .saturating_sub(self.max_size)
            .saturating_add(1);
        if self.entries.len() < self.max_size {
            return;
        }

        let mut by_expiry: Vec<(Option<Instant>, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.expires_at, entry.key().clone()))
            .collect();
        // Entries that never expire sort last.
        by_expiry.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        for (_, key) in by_expiry.into_iter().take(excess) {
            self.entries.remove(&key);
        }
        debug!(evicted = excess, "namespaced cache full, evicted entries");
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .remove(&Self::full_key(namespace, key))
            .is_some()
    }

    /// Drop every entry of `ns` and of its descendants. `/` empties the
    /// cache.
    pub fn invalidate_namespace(&self, ns: &str) {
        if ns == ROOT {
            self.clear();
            return;
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries
            .retain(|_, entry| !namespace::is_within(&entry.namespace, ns));
    }

    /// Apply a change notification.
    pub fn apply(&self, change: &NamespaceChange) {
        match change.kind {
            ChangeKind::Namespace => self.invalidate_namespace(&change.namespace),
            ChangeKind::Authorization if self.invalidate_on_authorization => {
                self.invalidate_namespace(&change.namespace);
            },
            ChangeKind::Authorization => {},
        }
    }

    /// Apply change notifications until the channel closes.
    ///
    /// A lagging receiver has missed notifications and clears the whole
    /// cache.
    pub async fn run_invalidation(&self, mut receiver: broadcast::Receiver<NamespaceChange>) {
        loop {
            match receiver.recv().await {
                Ok(change) => {
                    debug!(namespace = %change.namespace, kind = ?change.kind, "invalidating cache");
                    self.apply(&change);
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "cache invalidation lagged, clearing cache");
                    self.clear();
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }
}
