//! Insertion-ordered frequency maps.
//!
//! Ranking ties are broken by the order a key was first seen, so the map
//! must remember insertion order. Removing keys is never needed; the map is
//! only ever grown during a pass and cleared between passes.

use indexmap::IndexMap;
use std::hash::Hash;

/// Mapping from subject key to an accumulated count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyMap<K: Hash + Eq> {
    counts: IndexMap<K, u64>,
}

impl<K: Hash + Eq + Clone> FrequencyMap<K> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }

    /// Add `amount` to `key`, inserting it at the end if unseen.
    pub fn add(&mut self, key: K, amount: u64) {
        *self.counts.entry(key).or_insert(0) += amount;
    }

    /// Raise `key` to `value` if `value` is larger (max aggregation).
    pub fn raise_to(&mut self, key: K, value: u64) {
        let slot = self.counts.entry(key).or_insert(0);
        if value > *slot {
            *slot = value;
        }
    }

    /// Current value for `key`, zero if unseen.
    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Sum of all values.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    /// Entries sorted by descending value; equal values keep first-seen order.
    pub fn ranked(&self) -> Vec<(K, u64)> {
        let mut entries: Vec<(K, u64)> = self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        // sort_by is stable
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// The `n` highest entries, ranked as in [`FrequencyMap::ranked`].
    pub fn top(&self, n: usize) -> Vec<(K, u64)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

impl<K: Hash + Eq + Clone> Default for FrequencyMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
