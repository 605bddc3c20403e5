//! Memoised authorization decisions.

use crate::engine::AccessDecision;
use crate::role::{Permission, RoleSet};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Cache of decisions keyed by (effective role set, permission).
///
/// Decisions depend on nothing else, so entries never go stale while the
/// catalog they were computed from is alive. When the cache reaches capacity
/// it is cleared wholesale.
pub struct DecisionCache {
    entries: DashMap<(u8, Permission), AccessDecision>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl DecisionCache {
    /// Create a cache holding at most `capacity` decisions.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a decision, computing and storing it on a miss.
    pub fn get_or_insert_with<F>(&self, roles: RoleSet, permission: Permission, compute: F) -> AccessDecision
    where
        F: FnOnce() -> AccessDecision,
    {
        let key = (roles.bits(), permission);
        if let Some(decision) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return *decision;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let decision = compute();

        if self.entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "Decision cache full, clearing");
            self.entries.clear();
        }
        self.entries.insert(key, decision);
        decision
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    #[test]
    fn test_second_lookup_hits() {
        let cache = DecisionCache::new(16);
        let roles = RoleSet::empty().with(Role::Viewer);

        let first = cache.get_or_insert_with(roles, Permission::ProjectsRead, || AccessDecision::Allow);
        let second = cache.get_or_insert_with(roles, Permission::ProjectsRead, || {
            panic!("should not recompute")
        });

        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_capacity_bounds_size() {
        let cache = DecisionCache::new(2);
        let roles = RoleSet::empty().with(Role::Viewer);
        for permission in Permission::all() {
            cache.get_or_insert_with(roles, permission, || AccessDecision::Deny);
            assert!(cache.stats().size <= 2);
        }
    }
}
