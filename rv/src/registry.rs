//! Tag registry: pending waiters and early-published values, keyed by tag

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::cell::{Cell, Waiter};
use crate::coordinator::DoubleWaitPolicy;

/// How a new wait was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// No live waiter was pending for the tag
    Fresh,
    /// Live waiters were discarded in favor of the new one
    Replaced(usize),
    /// Appended behind earlier waiters at this 1-based queue position
    Queued(usize),
}

/// Result of dispatching a value to a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// A pending waiter received the value
    Resolved,
    /// Nobody was waiting; the value is cached for the next `wait_for_any`
    Cached { replaced: bool },
}

/// Smallest map size that triggers a sweep of dropped waiters
pub(crate) const SWEEP_FLOOR: usize = 64;

/// Pending cells and cached values per tag
///
/// Cells whose waiter has been dropped are skipped when dispatching and are not
/// counted as pending. They are swept out once the map doubles in size since
/// the previous sweep.
pub(crate) struct TagRegistry<K, V> {
    active: HashMap<K, VecDeque<Cell<V>>>,
    values: HashMap<K, V>,
    sweep_at: usize,
}

impl<K, V> Default for TagRegistry<K, V> {
    fn default() -> Self {
        Self {
            active: HashMap::new(),
            values: HashMap::new(),
            sweep_at: SWEEP_FLOOR,
        }
    }
}

impl<K: Eq + Hash, V> TagRegistry<K, V> {
    /// Register a new cell for `tag`
    pub(crate) fn wait(&mut self, tag: K, policy: DoubleWaitPolicy) -> (Waiter<V>, WaitOutcome) {
        if self.active.len() >= self.sweep_at {
            self.sweep();
        }

        let (cell, waiter) = Cell::channel();
        let queue = self.active.entry(tag).or_default();

        let outcome = match policy {
            DoubleWaitPolicy::Overwrite => {
                let live = queue.drain(..).filter(|c| !c.is_closed()).count();
                queue.push_back(cell);
                if live > 0 {
                    WaitOutcome::Replaced(live)
                } else {
                    WaitOutcome::Fresh
                }
            }
            DoubleWaitPolicy::Queue => {
                queue.retain(|c| !c.is_closed());
                queue.push_back(cell);
                if queue.len() > 1 {
                    WaitOutcome::Queued(queue.len())
                } else {
                    WaitOutcome::Fresh
                }
            }
        };

        (waiter, outcome)
    }

    /// Register a new cell only if no live waiter is pending for `tag`
    pub(crate) fn try_wait(&mut self, tag: K) -> Option<Waiter<V>> {
        if self.pending(&tag) > 0 {
            return None;
        }
        let (waiter, _) = self.wait(tag, DoubleWaitPolicy::Overwrite);
        Some(waiter)
    }

    /// Remove and return the cached value for `tag`
    pub(crate) fn take_value<Q>(&mut self, tag: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.remove(tag)
    }

    /// Resolve the oldest live waiter for `tag`, or cache the value
    pub(crate) fn dispatch(&mut self, tag: K, value: V) -> Dispatch {
        match self.resolve_next(&tag, value) {
            Ok(()) => Dispatch::Resolved,
            Err(value) => {
                let replaced = self.values.insert(tag, value).is_some();
                Dispatch::Cached { replaced }
            }
        }
    }

    fn resolve_next(&mut self, tag: &K, value: V) -> Result<(), V> {
        let Some(queue) = self.active.get_mut(tag) else {
            return Err(value);
        };

        let mut value = value;
        let result = loop {
            match queue.pop_front() {
                Some(cell) => match cell.resolve(value) {
                    Ok(()) => break Ok(()),
                    Err(returned) => value = returned,
                },
                None => break Err(value),
            }
        };

        if queue.is_empty() {
            self.active.remove(tag);
        }
        result
    }

    /// Number of live waiters for `tag`
    pub(crate) fn pending<Q>(&self, tag: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.active
            .get(tag)
            .map(|queue| queue.iter().filter(|c| !c.is_closed()).count())
            .unwrap_or(0)
    }

    pub(crate) fn has_value<Q>(&self, tag: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.contains_key(tag)
    }

    /// Drop every cell and the cached value for `tag`
    ///
    /// Returns the number of discarded cells and whether a value was cached.
    pub(crate) fn remove<Q>(&mut self, tag: &Q) -> (usize, bool)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let cells = self.active.remove(tag).map(|queue| queue.len()).unwrap_or(0);
        let value = self.values.remove(tag).is_some();
        (cells, value)
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
        self.values.clear();
        self.sweep_at = SWEEP_FLOOR;
    }

    /// Drop cells whose waiter is gone, and tags left without any
    pub(crate) fn sweep(&mut self) {
        self.active.retain(|_, queue| {
            queue.retain(|c| !c.is_closed());
            !queue.is_empty()
        });
        self.sweep_at = (self.active.len() * 2).max(SWEEP_FLOOR);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.active.len()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> TagRegistry<K, V> {
    /// Tags with live waiters, with their waiter counts
    pub(crate) fn active_entries(&self) -> Vec<(K, usize)> {
        self.active
            .iter()
            .map(|(tag, queue)| (tag.clone(), queue.iter().filter(|c| !c.is_closed()).count()))
            .filter(|(_, waiters)| *waiters > 0)
            .collect()
    }

    pub(crate) fn cached_entries(&self) -> Vec<(K, V)> {
        self.values
            .iter()
            .map(|(tag, value)| (tag.clone(), value.clone()))
            .collect()
    }
}
