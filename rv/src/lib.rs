//! Rendezvous - tag and group keyed async rendezvous
//!
//! Consumers wait on a tag or join a group and get a future back; producers
//! dispatch a value to the tag or group and every matching future resolves.
//! A value dispatched to a tag before anyone waits is cached and handed to the
//! next [`CoordinatorHandle::wait_for_any`].
//!
//! # Core Concepts
//!
//! - **Tag**: single-consumer rendezvous point, resolved once per dispatch
//! - **Cached value**: a tag dispatch nobody was waiting for
//! - **Group**: multi-consumer broadcast point, cleared by each dispatch
//! - **Purge / remove**: hard reset of all state or of one key
//!
//! # Example
//!
//! ```ignore
//! let coord = rendezvous::instance::<String, u32>();
//!
//! let waiter = coord.wait_for_next("ready");
//! coord.dispatch("ready", 42);
//! assert_eq!(waiter.await, 42);
//!
//! coord.dispatch("config", 7);
//! assert_eq!(coord.wait_for_any("config").await, 7);
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::OnceLock;

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;

mod cell;
mod group;
mod registry;

pub use cell::Waiter;
pub use coordinator::{
    ActiveEntry, CachedEntry, Coordinator, CoordinatorConfig, CoordinatorHandle, CoordinatorMetrics,
    DoubleWaitPolicy, GroupEntry, Snapshot,
};
pub use error::RendezvousError;

/// Create an independent Coordinator with default configuration
///
/// Nothing is shared with [`global`] or with other instances; use one per
/// test or per scoped set of tags and groups.
pub fn instance<K, V>() -> CoordinatorHandle<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Debug,
{
    CoordinatorHandle::new(CoordinatorConfig::default())
}

/// The process-wide Coordinator, created on first use
pub fn global() -> &'static CoordinatorHandle {
    static GLOBAL: OnceLock<CoordinatorHandle> = OnceLock::new();
    GLOBAL.get_or_init(instance)
}
