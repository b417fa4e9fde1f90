//! Cooperative cancellation for long-lived loops.
//!
//! Every accept loop (registry server, per-process remote listener) and the
//! heartbeat emitter is governed by one `ShutdownToken`. Cancelling it stops
//! future accepts; it does not cancel an exchange already in progress.

use std::sync::Arc;
use tokio::sync::watch;

/// A clonable cancellation signal.
///
/// All clones observe a `cancel()` issued on any of them. The token can be
/// polled synchronously with [`is_cancelled`](Self::is_cancelled) or awaited
/// inside `tokio::select!` via [`cancelled`](Self::cancelled).
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        ShutdownToken {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Requests cancellation. All clones observe it.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if *receiver.borrow() {
            return;
        }
        // The sender lives inside this token, so changed() cannot fail while
        // we are awaiting it.
        while receiver.changed().await.is_ok() {
            if *receiver.borrow() {
                return;
            }
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
