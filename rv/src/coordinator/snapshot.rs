//! Diagnostic snapshot and metrics types for the Coordinator

use serde::{Deserialize, Serialize};

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoordinatorMetrics {
    /// Tag waits that suspended (`wait_for_next`, or `wait_for_any` without a cached value)
    pub waits: u64,
    /// `wait_for_any` calls served from the cache
    pub cache_hits: u64,
    /// Tag dispatches that resolved a waiter
    pub dispatches_resolved: u64,
    /// Tag dispatches that were cached
    pub values_cached: u64,
    /// Pending waiters discarded by a later wait on the same tag
    pub waiters_overwritten: u64,
    pub group_joins: u64,
    pub group_dispatches: u64,
    /// Group dispatches that found no members
    pub empty_group_dispatches: u64,
    /// Group members that received a value
    pub members_resolved: u64,
    pub purges: u64,
    pub removals: u64,
}

/// A tag with live waiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveEntry<K> {
    pub tag: K,
    pub waiters: usize,
}

/// A value dispatched before anyone waited for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedEntry<K, V> {
    pub tag: K,
    pub value: V,
}

/// A broadcast group and its members' join positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry<K> {
    pub group: K,
    pub positions: Vec<usize>,
}

/// Point-in-time view of the Coordinator's three mappings
///
/// Entry order within each mapping is unspecified; member positions within a
/// group are in join order.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<K, V> {
    /// Capture time (Unix ms)
    #[serde(rename = "taken-at")]
    pub taken_at: i64,
    pub active: Vec<ActiveEntry<K>>,
    pub values: Vec<CachedEntry<K, V>>,
    pub pooled: Vec<GroupEntry<K>>,
    pub metrics: CoordinatorMetrics,
}

impl<K, V> Snapshot<K, V> {
    /// True when no waiter, cached value or group member is held
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.values.is_empty() && self.pooled.is_empty()
    }
}

impl<K: PartialEq, V> Snapshot<K, V> {
    pub fn is_active(&self, tag: &K) -> bool {
        self.active.iter().any(|entry| &entry.tag == tag)
    }

    pub fn cached(&self, tag: &K) -> Option<&V> {
        self.values.iter().find(|entry| &entry.tag == tag).map(|entry| &entry.value)
    }

    pub fn group(&self, group: &K) -> Option<&GroupEntry<K>> {
        self.pooled.iter().find(|entry| &entry.group == group)
    }
}
