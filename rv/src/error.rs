//! Rendezvous error types

use thiserror::Error;

/// Errors surfaced by the opt-in strict APIs
///
/// The base wait/dispatch operations never fail. These are only produced by
/// `try_wait_for_next` and `Waiter::into_result`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RendezvousError {
    #[error("A waiter is already pending for tag {tag}")]
    AlreadyWaiting { tag: String },

    #[error("Waiter was abandoned before a value was dispatched")]
    Abandoned,
}

impl RendezvousError {
    /// Check if this error means the waiter will never resolve
    pub fn is_abandoned(&self) -> bool {
        matches!(self, RendezvousError::Abandoned)
    }
}
