use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use std::time::Duration;

/// One-shot "signal and wait for completion" primitive.
///
/// Closing is idempotent and safe to request concurrently from any number of threads; only the
/// first call performs the transition. Observers can poll, block or `select!` on the closed state.
#[derive(Debug)]
pub struct LifecycleLatch {
    // Dropping the sender disconnects `closed`; nothing is ever sent on it
    signal: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

impl Default for LifecycleLatch {
    fn default() -> Self {
        LifecycleLatch::new()
    }
}

impl LifecycleLatch {
    /// Creates open latch.
    pub fn new() -> LifecycleLatch {
        let (sender, receiver) = crossbeam_channel::bounded(0);

        LifecycleLatch {
            signal: Mutex::new(Some(sender)),
            closed: receiver,
        }
    }

    /// Closes the latch releasing all waiters.
    ///
    /// Returns `true` if this call performed the transition, `false` if the latch was already
    /// closed.
    pub fn close(&self) -> bool {
        self.signal.lock().take().is_some()
    }

    /// Checks if the latch was closed; never blocks.
    pub fn is_closed(&self) -> bool {
        matches!(self.closed.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until the latch is closed.
    pub fn wait(&self) {
        // Only ever returns with disconnection
        let _ = self.closed.recv();
    }

    /// Blocks until the latch is closed or `timeout` elapses; returns `true` if closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.closed.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Receiver that becomes disconnected once the latch is closed; usable with `select!`.
    pub fn closed(&self) -> &Receiver<()> {
        &self.closed
    }
}

/// Closes the latch when dropped, including on unwind.
#[derive(Debug)]
pub(crate) struct CloseOnDrop<'l>(pub(crate) &'l LifecycleLatch);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}
