use super::batch::Batch;
use crate::buf_batch::Slot;
use crate::latch::LifecycleLatch;
use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, warn};

use std::sync::Arc;

/// Completed content handed from the accumulator to the transmitter.
#[derive(Debug)]
pub(crate) enum Transfer<I> {
    /// Buffer slot to be copied or lent out and then recycled.
    Slot(Slot<I>),
    /// Incoming batch forwarded untouched as its own output batch.
    Whole(Vec<I>),
}

/// Drains completed slots from the interim queue into the output queue.
///
/// In copy mode the slot content is moved into a freshly allocated buffer and the slot goes
/// back to the accumulator straight away. In no-copy mode the slot itself is lent to the
/// consumer and recycled only after the consumer releases it, or abandoned once `detached`
/// closes.
#[derive(Debug)]
pub(crate) struct Transmitter<I> {
    pub(crate) interim: Receiver<Transfer<I>>,
    pub(crate) recycle: Sender<Slot<I>>,
    pub(crate) output: Sender<Batch<I>>,
    pub(crate) detached: Arc<LifecycleLatch>,
    pub(crate) no_copy: bool,
}

impl<I> Transmitter<I> {
    /// Runs until the accumulator hangs up the interim queue or the consumer drops the output.
    pub(crate) fn run(self) {
        let (release, released) = crossbeam_channel::bounded(1);
        let mut batches = 0usize;

        for transfer in self.interim.iter() {
            let batch = match transfer {
                Transfer::Whole(items) => Batch::owned(items),
                Transfer::Slot(Slot { index, items }) if self.no_copy => {
                    if self.output.send(Batch::leased(items, release.clone())).is_err() {
                        warn!("output dropped with outstanding input; stopping");
                        return;
                    }
                    batches += 1;

                    // We hold `release`; only the consumer going away ends the wait early
                    let items = select! {
                        recv(released) -> items => items.ok(),
                        recv(self.detached.closed()) -> _ => None,
                    };
                    let Some(items) = items else {
                        warn!(slot = index, "output dropped with slot lent out; stopping");
                        return;
                    };
                    let _ = self.recycle.send(Slot { index, items });
                    continue;
                }
                Transfer::Slot(mut slot) => {
                    let items = slot.items.split_off(0);
                    // Accumulator may be gone after its final flush
                    let _ = self.recycle.send(slot);
                    Batch::owned(items)
                }
            };

            if self.output.send(batch).is_err() {
                warn!("output dropped with outstanding input; stopping");
                return;
            }
            batches += 1;
        }

        debug!(batches, "transmitter finished");
    }
}
