//! Coordinator for tag and group rendezvous
//!
//! The Coordinator owns three mappings and mediates every access to them:
//! - **active:** tag -> pending waiter (single resolution)
//! - **values:** tag -> value dispatched before anyone waited
//! - **pooled:** group -> members resolved together by one dispatch

mod config;
mod core;
mod handle;
mod snapshot;

pub use config::{CoordinatorConfig, DoubleWaitPolicy};
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use snapshot::{ActiveEntry, CachedEntry, CoordinatorMetrics, GroupEntry, Snapshot};
