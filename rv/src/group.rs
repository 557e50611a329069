//! Broadcast groups: every member that joined before a dispatch gets the value

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::cell::{Cell, Waiter};
use crate::registry::SWEEP_FLOOR;

/// Outcome of a group dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Broadcast {
    /// Members that were registered
    pub members: usize,
    /// Members whose waiter was still alive and received the value
    pub resolved: usize,
}

/// Member cells of one group, in join order
struct Pool<V> {
    cells: Vec<Cell<V>>,
    /// Members ever joined; positions keep counting past swept members
    joined: usize,
}

impl<V> Default for Pool<V> {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            joined: 0,
        }
    }
}

/// Member cells per group
///
/// Members whose waiter was dropped are not counted and are swept out once the
/// total number of held cells doubles since the previous sweep.
pub(crate) struct GroupRegistry<K, V> {
    pooled: HashMap<K, Pool<V>>,
    cells: usize,
    sweep_at: usize,
}

impl<K, V> Default for GroupRegistry<K, V> {
    fn default() -> Self {
        Self {
            pooled: HashMap::new(),
            cells: 0,
            sweep_at: SWEEP_FLOOR,
        }
    }
}

impl<K: Eq + Hash, V> GroupRegistry<K, V> {
    /// Append a member to `group`, creating it if needed
    pub(crate) fn join(&mut self, group: K) -> Waiter<V> {
        if self.cells >= self.sweep_at {
            self.sweep();
        }

        let pool = self.pooled.entry(group).or_default();
        pool.joined += 1;
        let (cell, waiter) = Cell::member(pool.joined);
        pool.cells.push(cell);
        self.cells += 1;
        waiter
    }

    /// Number of members still waiting on `group`
    pub(crate) fn members<Q>(&self, group: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.pooled
            .get(group)
            .map(|pool| pool.cells.iter().filter(|c| !c.is_closed()).count())
            .unwrap_or(0)
    }

    /// Drop `group` and all its members; returns how many were discarded
    pub(crate) fn remove<Q>(&mut self, group: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.pooled.remove(group).map(|pool| pool.cells.len()).unwrap_or(0);
        self.cells -= removed;
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.pooled.clear();
        self.cells = 0;
        self.sweep_at = SWEEP_FLOOR;
    }

    /// Drop members whose waiter is gone, and groups left without any
    pub(crate) fn sweep(&mut self) {
        self.pooled.retain(|_, pool| {
            pool.cells.retain(|c| !c.is_closed());
            !pool.cells.is_empty()
        });
        self.cells = self.pooled.values().map(|pool| pool.cells.len()).sum();
        self.sweep_at = (self.cells * 2).max(SWEEP_FLOOR);
    }

    #[cfg(test)]
    fn tracked(&self) -> (usize, usize) {
        (self.pooled.len(), self.cells)
    }
}

impl<K: Eq + Hash, V: Clone> GroupRegistry<K, V> {
    /// Resolve every member of `group` with `value` in join order and delete the group
    ///
    /// Returns `None` when no member received the value: the group was never
    /// joined, or every member dropped its waiter. The group is deleted either way.
    pub(crate) fn dispatch<Q>(&mut self, group: &Q, value: V) -> Option<Broadcast>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let pool = self.pooled.remove(group)?;
        let total = pool.cells.len();
        self.cells -= total;

        let resolved = pool
            .cells
            .into_iter()
            .map(|cell| cell.resolve(value.clone()))
            .filter(Result::is_ok)
            .count();

        (resolved > 0).then_some(Broadcast {
            members: total,
            resolved,
        })
    }
}

impl<K: Eq + Hash + Clone, V> GroupRegistry<K, V> {
    /// Groups with live members, with those members' join positions
    pub(crate) fn entries(&self) -> Vec<(K, Vec<usize>)> {
        self.pooled
            .iter()
            .filter_map(|(group, pool)| {
                let positions: Vec<usize> = pool
                    .cells
                    .iter()
                    .filter(|c| !c.is_closed())
                    .filter_map(Cell::position)
                    .collect();
                (!positions.is_empty()).then(|| (group.clone(), positions))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_join_assigns_positions() {
        let mut groups: GroupRegistry<String, u32> = GroupRegistry::default();
        let first = groups.join("friends".to_string());
        let second = groups.join("friends".to_string());
        let other = groups.join("others".to_string());

        assert_eq!(first.position(), Some(1));
        assert_eq!(second.position(), Some(2));
        assert_eq!(other.position(), Some(1));
        assert_eq!(groups.members("friends"), 2);
    }

    #[test]
    fn test_dispatch_resolves_all_members() {
        let mut groups: GroupRegistry<&str, &str> = GroupRegistry::default();
        let waiters: Vec<_> = (0..3).map(|_| groups.join("friends")).collect();

        let broadcast = groups.dispatch("friends", "go").unwrap();
        assert_eq!(broadcast, Broadcast { members: 3, resolved: 3 });
        for waiter in waiters {
            assert_eq!(waiter.now_or_never(), Some("go"));
        }

        assert_eq!(groups.members("friends"), 0);
        assert!(groups.dispatch("friends", "again").is_none());
    }

    #[test]
    fn test_dispatch_counts_dropped_members() {
        let mut groups: GroupRegistry<&str, u32> = GroupRegistry::default();
        let kept = groups.join("g");
        drop(groups.join("g"));

        let broadcast = groups.dispatch("g", 9).unwrap();
        assert_eq!(broadcast, Broadcast { members: 2, resolved: 1 });
        assert_eq!(kept.now_or_never(), Some(9));
    }

    #[test]
    fn test_entries_keep_join_order() {
        let mut groups: GroupRegistry<&str, u32> = GroupRegistry::default();
        let _a = groups.join("g");
        let _b = groups.join("g");
        let _c = groups.join("g");

        assert_eq!(groups.entries(), vec![("g", vec![1, 2, 3])]);
        assert_eq!(groups.remove("g"), 3);
        assert!(groups.entries().is_empty());
    }

    #[test]
    fn test_dropped_members_are_not_counted() {
        let mut groups: GroupRegistry<&str, u32> = GroupRegistry::default();
        drop(groups.join("g"));
        drop(groups.join("g"));

        assert_eq!(groups.members("g"), 0);
        assert!(groups.entries().is_empty());
        assert!(groups.dispatch("g", 1).is_none());
        assert_eq!(groups.tracked(), (0, 0));
    }

    #[test]
    fn test_dropped_members_are_swept() {
        let mut groups: GroupRegistry<String, u32> = GroupRegistry::default();
        let live = groups.join("friends".to_string());

        for i in 0..10_000 {
            drop(groups.join(format!("g{i}")));
            drop(groups.join("friends".to_string()));
        }
        let (_, cells) = groups.tracked();
        assert!(cells <= SWEEP_FLOOR);

        groups.sweep();
        assert_eq!(groups.tracked(), (1, 1));
        assert_eq!(groups.members("friends"), 1);

        // Positions keep counting past swept members
        let next = groups.join("friends".to_string());
        assert_eq!(next.position(), Some(10_002));
        assert_eq!(groups.entries(), vec![("friends".to_string(), vec![1, 10_002])]);

        drop((live, next));
        groups.sweep();
        assert_eq!(groups.tracked(), (0, 0));
    }
}
