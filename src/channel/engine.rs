use super::transmit::Transfer;
use crate::buf_batch::BufBatch;
use crate::channel::EndOfStreamError;
use crate::timeout::TimeoutDetector;
use crossbeam_channel::Sender;
use tracing::{debug, trace};

/// Cause of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushReason {
    /// Buffer reached join size.
    Size,
    /// No flush happened within timeout.
    Timeout,
    /// Input source was exhausted.
    Closure,
    /// Incoming batch does not fit next to buffered items.
    Overflow,
    /// Incoming batch alone reaches join size and is forwarded whole.
    Oversize,
}

/// Flush machinery shared by join and unite accumulators.
///
/// Every method returning `Err(EndOfStreamError)` means the transmitter is gone and the
/// accumulator should stop.
#[derive(Debug)]
pub(crate) struct Engine<I> {
    pub(crate) buffer: BufBatch<I>,
    pub(crate) detector: TimeoutDetector,
    interim: Sender<Transfer<I>>,
    batches: usize,
    items: usize,
}

impl<I> Engine<I> {
    pub(crate) fn new(
        buffer: BufBatch<I>,
        detector: TimeoutDetector,
        interim: Sender<Transfer<I>>,
    ) -> Engine<I> {
        Engine {
            buffer,
            detector,
            interim,
            batches: 0,
            items: 0,
        }
    }

    /// Hands current buffer over to the transmitter unless it is empty.
    ///
    /// Blocks until the transmitter takes the slot. The timeout window restarts only when a
    /// batch is actually emitted, so an item arriving after an idle period already past the
    /// timeout is flushed on the next wake-up.
    pub(crate) fn flush(&mut self, reason: FlushReason) -> Result<(), EndOfStreamError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let len = self.buffer.len();
        let slot = self.buffer.take().ok_or(EndOfStreamError)?;
        trace!(?reason, slot = slot.index, len, "flush");

        self.interim
            .send(Transfer::Slot(slot))
            .map_err(|_| EndOfStreamError)?;

        self.batches += 1;
        self.items += len;
        self.detector.reset();
        Ok(())
    }

    /// Sends incoming batch to the transmitter as its own output batch.
    pub(crate) fn forward(&mut self, items: Vec<I>) -> Result<(), EndOfStreamError> {
        let len = items.len();
        trace!(reason = ?FlushReason::Oversize, len, "forward");

        self.interim
            .send(Transfer::Whole(items))
            .map_err(|_| EndOfStreamError)?;

        self.batches += 1;
        self.items += len;
        self.detector.reset();
        Ok(())
    }

    /// Handles periodic wake-up flushing buffer if timeout has elapsed.
    pub(crate) fn tick(&mut self) -> Result<(), EndOfStreamError> {
        if self.detector.expired() {
            self.flush(FlushReason::Timeout)?;
        }
        Ok(())
    }

    /// Flushes remaining items after input source was exhausted.
    pub(crate) fn close(mut self) {
        let _ = self.flush(FlushReason::Closure);
        debug!(batches = self.batches, items = self.items, "accumulator finished");
        // Dropping `interim` lets the transmitter finish
    }
}
