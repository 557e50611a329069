//! Coordinator state and operations

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::snapshot::{ActiveEntry, CachedEntry, CoordinatorMetrics, GroupEntry, Snapshot};
use crate::cell::Waiter;
use crate::error::RendezvousError;
use crate::group::GroupRegistry;
use crate::registry::{Dispatch, TagRegistry, WaitOutcome};

/// Everything the Coordinator owns, mutated under one lock
struct State<K, V> {
    tags: TagRegistry<K, V>,
    groups: GroupRegistry<K, V>,
    metrics: CoordinatorMetrics,
}

impl<K, V> Default for State<K, V> {
    fn default() -> Self {
        Self {
            tags: TagRegistry::default(),
            groups: GroupRegistry::default(),
            metrics: CoordinatorMetrics::default(),
        }
    }
}

/// The Coordinator owns the tag registry, the value cache and the broadcast groups
///
/// Every operation takes the state lock once, so each wait/dispatch is a single
/// atomic step relative to every other operation. Nothing here suspends; only
/// the returned [`Waiter`]s do.
pub struct Coordinator<K, V> {
    config: CoordinatorConfig,
    state: Mutex<State<K, V>>,
}

impl<K, V> Coordinator<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Debug,
{
    /// Create a new Coordinator with the given configuration
    pub fn new(config: CoordinatorConfig) -> Self {
        debug!(?config, "Coordinator::new: called");
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, State<K, V>> {
        // The maps are never left half-updated, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait_for_next(&self, tag: K) -> Waiter<V> {
        let mut state = self.state();
        self.register(&mut state, tag)
    }

    fn register(&self, state: &mut State<K, V>, tag: K) -> Waiter<V> {
        state.metrics.waits += 1;
        let (waiter, outcome) = state.tags.wait(tag.clone(), self.config.double_wait);

        match outcome {
            WaitOutcome::Fresh => debug!(?tag, "Registered waiter"),
            WaitOutcome::Queued(position) => debug!(?tag, position, "Queued waiter"),
            WaitOutcome::Replaced(count) => {
                state.metrics.waiters_overwritten += count as u64;
                if self.config.warn_on_overwrite {
                    warn!(?tag, count, "Overwrote pending waiter; it will never resolve");
                } else {
                    debug!(?tag, count, "Overwrote pending waiter");
                }
            }
        }

        waiter
    }

    pub fn try_wait_for_next(&self, tag: K) -> Result<Waiter<V>, RendezvousError> {
        let mut state = self.state();
        match state.tags.try_wait(tag.clone()) {
            Some(waiter) => {
                state.metrics.waits += 1;
                debug!(?tag, "Registered waiter");
                Ok(waiter)
            }
            None => {
                debug!(?tag, "Refused second waiter");
                Err(RendezvousError::AlreadyWaiting {
                    tag: format!("{:?}", tag),
                })
            }
        }
    }

    pub fn wait_for_any(&self, tag: K) -> Waiter<V> {
        let mut state = self.state();
        if let Some(value) = state.tags.take_value(&tag) {
            state.metrics.cache_hits += 1;
            debug!(?tag, "Served cached value");
            return Waiter::ready(value);
        }
        self.register(&mut state, tag)
    }

    pub fn dispatch(&self, tag: K, data: V) {
        let mut state = self.state();
        match state.tags.dispatch(tag.clone(), data) {
            Dispatch::Resolved => {
                state.metrics.dispatches_resolved += 1;
                debug!(?tag, "Resolved waiter");
            }
            Dispatch::Cached { replaced } => {
                state.metrics.values_cached += 1;
                debug!(?tag, replaced, "No waiter, cached value");
            }
        }
    }

    pub fn wait_for_group(&self, group: K) -> Waiter<V> {
        let mut state = self.state();
        state.metrics.group_joins += 1;
        let waiter = state.groups.join(group.clone());
        debug!(?group, position = ?waiter.position(), "Joined group");
        waiter
    }

    pub fn dispatch_group<Q>(&self, group: &Q, data: V)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let mut state = self.state();
        state.metrics.group_dispatches += 1;

        match state.groups.dispatch(group, data) {
            Some(broadcast) => {
                state.metrics.members_resolved += broadcast.resolved as u64;
                debug!(
                    ?group,
                    members = broadcast.members,
                    resolved = broadcast.resolved,
                    "Broadcast to group"
                );
            }
            None => {
                state.metrics.empty_group_dispatches += 1;
                if self.config.warn_on_empty_group {
                    warn!(?group, "No dispatch group");
                } else {
                    debug!(?group, "No dispatch group");
                }
            }
        }
    }

    /// Drop every waiter, cached value and group member
    ///
    /// Outstanding waiters are abandoned and never resolve.
    pub fn purge(&self) {
        let mut state = self.state();
        state.tags.clear();
        state.groups.clear();
        state.metrics.purges += 1;
        info!("Coordinator purged");
    }

    /// Clear `tag` from the active waiters, the value cache and the groups
    pub fn remove<Q>(&self, tag: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let mut state = self.state();
        let (cells, cached) = state.tags.remove(tag);
        let members = state.groups.remove(tag);
        state.metrics.removals += 1;
        debug!(?tag, cells, cached, members, "Removed tag");
    }

    pub fn pending<Q>(&self, tag: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state().tags.pending(tag)
    }

    pub fn has_value<Q>(&self, tag: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state().tags.has_value(tag)
    }

    pub fn members<Q>(&self, group: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state().groups.members(group)
    }

    pub fn metrics(&self) -> CoordinatorMetrics {
        self.state().metrics.clone()
    }

    /// Current mappings, after sweeping out dropped waiters
    pub fn snapshot(&self) -> Snapshot<K, V> {
        let mut state = self.state();
        state.tags.sweep();
        state.groups.sweep();
        Snapshot {
            taken_at: chrono::Utc::now().timestamp_millis(),
            active: state
                .tags
                .active_entries()
                .into_iter()
                .map(|(tag, waiters)| ActiveEntry { tag, waiters })
                .collect(),
            values: state
                .tags
                .cached_entries()
                .into_iter()
                .map(|(tag, value)| CachedEntry { tag, value })
                .collect(),
            pooled: state
                .groups
                .entries()
                .into_iter()
                .map(|(group, positions)| GroupEntry { group, positions })
                .collect(),
            metrics: state.metrics.clone(),
        }
    }

    /// Log the three mappings and return them
    pub fn inspect(&self) -> Snapshot<K, V> {
        let snapshot = self.snapshot();
        info!(active = ?snapshot.active, "Coordinator active");
        info!(values = ?snapshot.values, "Coordinator values");
        info!(pooled = ?snapshot.pooled, "Coordinator pooled");
        snapshot
    }
}
