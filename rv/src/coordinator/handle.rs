//! CoordinatorHandle - Client interface for tag and group rendezvous

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use super::config::CoordinatorConfig;
use super::core::Coordinator;
use super::snapshot::{CoordinatorMetrics, Snapshot};
use crate::cell::Waiter;
use crate::error::RendezvousError;

/// Handle for producers and consumers to rendezvous through a Coordinator
///
/// This handle is cloneable; clones share the same tags, cached values and
/// groups. Wait operations return a [`Waiter`] immediately; dispatch operations
/// never block and never fail.
pub struct CoordinatorHandle<K = String, V = serde_json::Value> {
    inner: Arc<Coordinator<K, V>>,
}

impl<K, V> Clone for CoordinatorHandle<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for CoordinatorHandle<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Debug,
{
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl<K, V> CoordinatorHandle<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Debug,
{
    /// Create a handle over a new, isolated Coordinator
    pub fn new(config: CoordinatorConfig) -> Self {
        debug!(?config, "CoordinatorHandle::new: called");
        Self {
            inner: Arc::new(Coordinator::new(config)),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        self.inner.config()
    }

    /// Wait for the next value dispatched to `tag`
    ///
    /// Any cached value for the tag is ignored. Under the default
    /// [`DoubleWaitPolicy::Overwrite`](super::DoubleWaitPolicy::Overwrite) a
    /// waiter already pending on the tag is discarded and never resolves.
    pub fn wait_for_next(&self, tag: impl Into<K>) -> Waiter<V> {
        let tag = tag.into();
        debug!(?tag, "CoordinatorHandle::wait_for_next: called");
        self.inner.wait_for_next(tag)
    }

    /// Like [`wait_for_next`](Self::wait_for_next), but refuses to replace a live waiter
    pub fn try_wait_for_next(&self, tag: impl Into<K>) -> Result<Waiter<V>, RendezvousError> {
        let tag = tag.into();
        debug!(?tag, "CoordinatorHandle::try_wait_for_next: called");
        self.inner.try_wait_for_next(tag)
    }

    /// Take the cached value for `tag` if one was dispatched early, otherwise wait
    ///
    /// A cached value is consumed: the returned waiter is already resolved and a
    /// second call suspends.
    pub fn wait_for_any(&self, tag: impl Into<K>) -> Waiter<V> {
        let tag = tag.into();
        debug!(?tag, "CoordinatorHandle::wait_for_any: called");
        self.inner.wait_for_any(tag)
    }

    /// Resolve the waiter pending on `tag`, or cache `data` for the next `wait_for_any`
    pub fn dispatch(&self, tag: impl Into<K>, data: V) {
        let tag = tag.into();
        debug!(?tag, "CoordinatorHandle::dispatch: called");
        self.inner.dispatch(tag, data);
    }

    /// Join `group`; resolves with the value of the next group dispatch
    pub fn wait_for_group(&self, group: impl Into<K>) -> Waiter<V> {
        let group = group.into();
        debug!(?group, "CoordinatorHandle::wait_for_group: called");
        self.inner.wait_for_group(group)
    }

    /// Resolve every current member of `group` with `data` and clear the group
    ///
    /// A group nobody joined is only logged; group dispatches are never cached.
    pub fn dispatch_group<Q>(&self, group: &Q, data: V)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        debug!(?group, "CoordinatorHandle::dispatch_group: called");
        self.inner.dispatch_group(group, data);
    }

    /// Clear all waiters, cached values and groups
    pub fn purge(&self) {
        debug!("CoordinatorHandle::purge: called");
        self.inner.purge();
    }

    /// Clear `tag` from waiters, cached values and groups alike
    pub fn remove<Q>(&self, tag: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        debug!(?tag, "CoordinatorHandle::remove: called");
        self.inner.remove(tag);
    }

    /// Log the current waiters, cached values and groups, and return them
    pub fn inspect(&self) -> Snapshot<K, V> {
        debug!("CoordinatorHandle::inspect: called");
        self.inner.inspect()
    }

    /// Same as [`inspect`](Self::inspect) without logging
    pub fn snapshot(&self) -> Snapshot<K, V> {
        self.inner.snapshot()
    }

    /// Number of live waiters on `tag`
    pub fn pending<Q>(&self, tag: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.pending(tag)
    }

    pub fn has_value<Q>(&self, tag: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.has_value(tag)
    }

    /// Number of members waiting in `group`
    pub fn members<Q>(&self, group: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.members(group)
    }

    pub fn metrics(&self) -> CoordinatorMetrics {
        debug!("CoordinatorHandle::metrics: called");
        self.inner.metrics()
    }
}
