//! Coordinator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What `wait_for_next` does when the tag already has a pending waiter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DoubleWaitPolicy {
    /// Replace the pending waiter; the earlier one never resolves
    #[default]
    Overwrite,

    /// Keep every waiter in arrival order; each dispatch resolves the oldest
    Queue,
}

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoordinatorConfig {
    /// Behavior of a second wait on a tag that is already pending
    #[serde(default)]
    pub double_wait: DoubleWaitPolicy,

    /// Warn when a pending waiter is overwritten
    #[serde(default = "default_warn_on_overwrite")]
    pub warn_on_overwrite: bool,

    /// Warn when dispatching to a group nobody joined
    #[serde(default = "default_warn_on_empty_group")]
    pub warn_on_empty_group: bool,
}

fn default_warn_on_overwrite() -> bool {
    debug!("default_warn_on_overwrite: called");
    true
}

fn default_warn_on_empty_group() -> bool {
    debug!("default_warn_on_empty_group: called");
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            double_wait: DoubleWaitPolicy::default(),
            warn_on_overwrite: default_warn_on_overwrite(),
            warn_on_empty_group: default_warn_on_empty_group(),
        }
    }
}

impl CoordinatorConfig {
    /// Use the given double-wait policy
    pub fn with_double_wait(mut self, policy: DoubleWaitPolicy) -> Self {
        debug!(?policy, "CoordinatorConfig::with_double_wait: called");
        self.double_wait = policy;
        self
    }
}
