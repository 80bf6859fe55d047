//! Cache stores
//!
//! Two shapes: [`Cache`] keyed by id, and [`GroupedCache`] keyed by
//! `(parent, id)` with a per-parent index for bulk eviction. Both use
//! `DashMap` for concurrent access and return value copies on read;
//! mutation happens only through the insert/remove paths.

use chat_core::Snowflake;
use dashmap::DashMap;
use std::collections::HashSet;

use crate::policy::CachePolicy;

/// Id-keyed cache
#[derive(Debug)]
pub struct Cache<T> {
    enabled: bool,
    entries: DashMap<Snowflake, T>,
}

impl<T: Clone> Cache<T> {
    /// Create a cache; a disabled cache drops writes and misses reads
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: DashMap::new(),
        }
    }

    /// Check if this cache stores anything at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Insert a value, returning the previous value for this id
    pub fn insert(&self, id: Snowflake, value: T) -> Option<T> {
        if !self.enabled {
            return None;
        }
        self.entries.insert(id, value)
    }

    /// Get a copy of the value for an id
    pub fn get(&self, id: Snowflake) -> Option<T> {
        self.entries.get(&id).map(|r| r.clone())
    }

    /// Remove and return the value for an id
    pub fn remove(&self, id: Snowflake) -> Option<T> {
        self.entries.remove(&id).map(|(_, v)| v)
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy out all values satisfying a predicate
    pub fn find_all(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.entries
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

/// `(parent, id)`-keyed cache with per-parent eviction
#[derive(Debug)]
pub struct GroupedCache<T> {
    enabled: bool,
    policy: CachePolicy<T>,
    entries: DashMap<(Snowflake, Snowflake), T>,
    /// parent id -> member ids, kept in lockstep with `entries`
    groups: DashMap<Snowflake, HashSet<Snowflake>>,
}

impl<T: Clone> GroupedCache<T> {
    /// Create a grouped cache with a retention policy
    #[must_use]
    pub fn new(enabled: bool, policy: CachePolicy<T>) -> Self {
        Self {
            enabled,
            policy,
            entries: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Check if this cache stores anything at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Insert a value if the policy retains it, returning the previous value
    ///
    /// A rejected value also evicts any stale entry under the same key, so a
    /// policy flipping from retain to drop cannot leave ghosts behind.
    pub fn insert(&self, parent: Snowflake, id: Snowflake, value: T) -> Option<T> {
        if !self.enabled {
            return None;
        }
        if !self.policy.test(&value) {
            return self.remove(parent, id);
        }

        self.groups.entry(parent).or_default().insert(id);
        self.entries.insert((parent, id), value)
    }

    /// Get a copy of the value under `(parent, id)`
    pub fn get(&self, parent: Snowflake, id: Snowflake) -> Option<T> {
        self.entries.get(&(parent, id)).map(|r| r.clone())
    }

    /// Remove and return the value under `(parent, id)`
    pub fn remove(&self, parent: Snowflake, id: Snowflake) -> Option<T> {
        let removed = self.entries.remove(&(parent, id)).map(|(_, v)| v);

        if removed.is_some() {
            self.groups.alter(&parent, |_, mut ids| {
                ids.remove(&id);
                ids
            });
            self.groups.retain(|_, ids| !ids.is_empty());
        }

        removed
    }

    /// Remove a whole parent group, returning how many entries were evicted
    pub fn remove_group(&self, parent: Snowflake) -> usize {
        let Some((_, ids)) = self.groups.remove(&parent) else {
            return 0;
        };

        let mut removed = 0;
        for id in ids {
            if self.entries.remove(&(parent, id)).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Copy out all values under a parent
    pub fn group_values(&self, parent: Snowflake) -> Vec<T> {
        self.groups
            .get(&parent)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entries.get(&(parent, *id)).map(|r| r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of cached entries across all groups
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_insert_get_remove() {
        let cache: Cache<String> = Cache::new(true);
        let id = Snowflake::new(1);

        assert!(cache.insert(id, "a".to_string()).is_none());
        assert_eq!(cache.insert(id, "b".to_string()), Some("a".to_string()));
        assert_eq!(cache.get(id), Some("b".to_string()));
        assert_eq!(cache.remove(id), Some("b".to_string()));
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn test_disabled_cache_drops_writes() {
        let cache: Cache<String> = Cache::new(false);
        let id = Snowflake::new(1);

        cache.insert(id, "a".to_string());
        assert!(cache.get(id).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_grouped_insert_and_group_values() {
        let cache: GroupedCache<u32> = GroupedCache::new(true, CachePolicy::all());
        let guild = Snowflake::new(1);

        cache.insert(guild, Snowflake::new(10), 10);
        cache.insert(guild, Snowflake::new(11), 11);
        cache.insert(Snowflake::new(2), Snowflake::new(10), 99);

        let mut values = cache.group_values(guild);
        values.sort_unstable();
        assert_eq!(values, vec![10, 11]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_grouped_remove_group() {
        let cache: GroupedCache<u32> = GroupedCache::new(true, CachePolicy::all());
        let guild = Snowflake::new(1);

        cache.insert(guild, Snowflake::new(10), 10);
        cache.insert(guild, Snowflake::new(11), 11);
        cache.insert(Snowflake::new(2), Snowflake::new(12), 12);

        assert_eq!(cache.remove_group(guild), 2);
        assert!(cache.group_values(guild).is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remove_group(guild), 0);
    }

    #[test]
    fn test_policy_rejection_evicts_stale_entry() {
        let cache: GroupedCache<u32> = GroupedCache::new(true, CachePolicy::new(|v| *v < 100));
        let guild = Snowflake::new(1);
        let id = Snowflake::new(10);

        cache.insert(guild, id, 5);
        assert_eq!(cache.get(guild, id), Some(5));

        // Update fails the policy: the old entry must go too.
        cache.insert(guild, id, 500);
        assert!(cache.get(guild, id).is_none());
        assert!(cache.group_values(guild).is_empty());
    }

    #[test]
    fn test_value_copy_isolation() {
        let cache: Cache<Vec<u32>> = Cache::new(true);
        let id = Snowflake::new(1);
        cache.insert(id, vec![1, 2]);

        let mut copy = cache.get(id).unwrap();
        copy.push(3);

        assert_eq!(cache.get(id).unwrap(), vec![1, 2]);
    }
}
