//! Rendezvous cells and the waiter future they resolve
//!
//! A [`Cell`] is the producer half of one pending wait; the matching
//! [`Waiter`] is handed to the consumer. Both are backed by a tokio oneshot
//! channel, so a cell resolves at most once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::RendezvousError;

/// Producer side of a single rendezvous
pub(crate) struct Cell<V> {
    tx: oneshot::Sender<V>,
    position: Option<usize>,
}

impl<V> Cell<V> {
    /// Create a cell for a tag wait
    pub(crate) fn channel() -> (Self, Waiter<V>) {
        Self::with_position(None)
    }

    /// Create a cell for a group member at the given 1-based position
    pub(crate) fn member(position: usize) -> (Self, Waiter<V>) {
        Self::with_position(Some(position))
    }

    fn with_position(position: Option<usize>) -> (Self, Waiter<V>) {
        let (tx, rx) = oneshot::channel();
        (
            Self { tx, position },
            Waiter {
                rx: Some(rx),
                position,
            },
        )
    }

    pub(crate) fn position(&self) -> Option<usize> {
        self.position
    }

    /// Resolve the waiter with `value`
    ///
    /// Hands the value back when the consumer already dropped its waiter.
    pub(crate) fn resolve(self, value: V) -> Result<(), V> {
        self.tx.send(value)
    }

    /// True when the consumer dropped its waiter
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Future returned by every wait operation
///
/// Resolves to the dispatched value. A waiter whose cell is discarded (purge,
/// remove, or an overwriting wait) stays pending forever; use
/// [`Waiter::into_result`] to observe that case instead.
#[derive(Debug)]
pub struct Waiter<V> {
    rx: Option<oneshot::Receiver<V>>,
    position: Option<usize>,
}

impl<V> Waiter<V> {
    /// A waiter that is already resolved with `value`
    pub(crate) fn ready(value: V) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(value);
        Self { rx: Some(rx), position: None }
    }

    /// 1-based join position for group members, `None` for tag waiters
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Take the value if it has already been dispatched, without suspending
    pub fn try_take(&mut self) -> Option<V> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(value) => {
                self.rx = None;
                Some(value)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.rx = None;
                None
            }
        }
    }

    /// Wait for the value, failing with [`RendezvousError::Abandoned`] when the
    /// cell was discarded or the value was already taken
    pub async fn into_result(mut self) -> Result<V, RendezvousError> {
        let rx = self.rx.take().ok_or(RendezvousError::Abandoned)?;
        rx.await.map_err(|_| RendezvousError::Abandoned)
    }
}

impl<V> Future for Waiter<V> {
    type Output = V;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<V> {
        let this = self.get_mut();
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Pending;
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(value)) => {
                this.rx = None;
                Poll::Ready(value)
            }
            // Sender dropped without a value: never resolves, nothing left to wake us
            Poll::Ready(Err(_)) => {
                this.rx = None;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
