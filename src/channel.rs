//! Disciplines running on a pair of background threads connected with channels.
//!
//! The accumulator thread waits on the input source and on the timeout ticker at the same time
//! using `crossbeam_channel::select!`, fills buffer slots and pushes completed slots through a
//! zero-capacity hand-off queue. The transmitter thread turns slots into output batches.
//! Because the hand-off queue has no capacity the accumulator can never get more than one slot
//! ahead of the transmitter.

pub mod batch;
mod engine;
pub mod join;
mod transmit;
pub mod unite;

pub use batch::Batch;

use crate::buf_batch::{BufBatch, SLOTS_COUNT};
use crate::config::Settings;
use crate::latch::{CloseOnDrop, LifecycleLatch};
use engine::Engine;
use transmit::Transmitter;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The error that is returned when the discipline has terminated and all its batches were
/// consumed.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct EndOfStreamError;

impl fmt::Display for EndOfStreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no more batches will be provided by this discipline")
    }
}

impl Error for EndOfStreamError {}

/// Capacity of the output queue; one batch can wait for the consumer.
const OUTPUT_CAPACITY: usize = 1;

/// Running discipline providing its output batches.
///
/// Created with `Discipline::join` or `Discipline::unite`. The discipline terminates after its
/// input source is exhausted and all batches were flushed; closure of the output is the only
/// termination signal.
///
/// Dropping the discipline stops its threads even if a leased batch was never released; the
/// input source is then disconnected and its remaining items are abandoned.
#[derive(Debug)]
pub struct Discipline<I> {
    output: Receiver<Batch<I>>,
    terminated: Arc<LifecycleLatch>,
    detached: Arc<LifecycleLatch>,
}

impl<I: Send + 'static> Discipline<I> {
    /// Starts accumulator and transmitter threads.
    ///
    /// `accumulate` is called on the accumulator thread with the input source and the engine
    /// and has to return once the input source is exhausted or the engine reports the
    /// transmitter gone.
    pub(crate) fn launch<S: Send + 'static>(
        name: &str,
        input: Receiver<S>,
        settings: Settings,
        accumulate: impl FnOnce(Receiver<S>, Engine<I>) + Send + 'static,
    ) -> Discipline<I> {
        debug!(
            discipline = name,
            join_size = settings.join_size,
            no_copy = settings.no_copy,
            timeout = ?settings.detector.timeout(),
            interval = ?settings.detector.interval(),
            "starting"
        );

        let (interim, interim_receiver) = crossbeam_channel::bounded(0);
        let (recycle, recycled) = crossbeam_channel::bounded(SLOTS_COUNT);
        let (output, output_receiver) = crossbeam_channel::bounded(OUTPUT_CAPACITY);
        let terminated = Arc::new(LifecycleLatch::new());
        let detached = Arc::new(LifecycleLatch::new());

        let transmitter = Transmitter {
            interim: interim_receiver,
            recycle,
            output,
            detached: detached.clone(),
            no_copy: settings.no_copy,
        };
        let latch = terminated.clone();
        std::thread::Builder::new()
            .name(format!("{} transmitter", name))
            .spawn(move || {
                let _closed = CloseOnDrop(&latch);
                transmitter.run();
            })
            .expect("failed to start transmitter thread");

        let engine = Engine::new(
            BufBatch::new(settings.join_size, recycled),
            settings.detector,
            interim,
        );
        std::thread::Builder::new()
            .name(format!("{} accumulator", name))
            .spawn(move || accumulate(input, engine))
            .expect("failed to start accumulator thread");

        Discipline {
            output: output_receiver,
            terminated,
            detached,
        }
    }
}

impl<I> Discipline<I> {
    /// Gets next batch.
    ///
    /// This call will block until a batch becomes ready.
    ///
    /// Returns `Err(EndOfStreamError)` after the input source was exhausted and all batches were
    /// provided.
    pub fn next(&self) -> Result<Batch<I>, EndOfStreamError> {
        self.output.recv().map_err(|_| EndOfStreamError)
    }

    /// Gets next batch waiting no longer than `timeout`.
    ///
    /// Returns `Ok(None)` if no batch became ready in time.
    pub fn next_timeout(&self, timeout: Duration) -> Result<Option<Batch<I>>, EndOfStreamError> {
        match self.output.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EndOfStreamError),
        }
    }

    /// Iterates remaining batches until the discipline terminates.
    pub fn iter(&self) -> impl Iterator<Item = Batch<I>> + '_ {
        self.output.iter()
    }

    /// Output receiver; usable with `select!`.
    pub fn output(&self) -> &Receiver<Batch<I>> {
        &self.output
    }

    /// Checks if the discipline has closed its output.
    ///
    /// Batches still buffered in the output can be received after termination.
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_closed()
    }

    /// Blocks until the discipline closes its output.
    ///
    /// Batches have to keep being consumed (and released in no-copy mode) for this to return.
    pub fn wait(&self) {
        self.terminated.wait()
    }

    /// Like `wait` but gives up after `timeout`; returns `true` if terminated.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.terminated.wait_timeout(timeout)
    }
}

impl<I> Drop for Discipline<I> {
    fn drop(&mut self) {
        if !self.terminated.is_closed() {
            debug!("output dropped before termination");
        }
        // Wakes up the transmitter if it waits for a lease that will never be released
        self.detached.close();
    }
}
