/*!
Flow-control disciplines that regroup a stream of items, or of already batched items, into
size or time bounded output batches while preserving the order of all items.

* `Discipline::join` groups single items into batches of up to `join_size` items.
* `Discipline::unite` coalesces incoming batches into larger batches without ever splitting an
  incoming batch; an incoming batch of `join_size` or more items is forwarded whole.

Batches are flushed when they reach `join_size`, when the configured timeout elapses since the
previous flush and when the input source is exhausted. Each discipline runs an accumulator
and a transmitter thread; in no-copy mode buffer slots are lent to the consumer and have to be
given back with `Batch::release` before they are reused.

`PartitionOracle` predicts the exact batch boundaries a discipline produces.
!*/

pub(crate) mod buf_batch;
pub mod channel;
pub mod config;
pub mod error;
pub mod latch;
pub mod partition;
pub mod rotator;
pub mod timeout;

pub use channel::{Batch, Discipline, EndOfStreamError};
pub use config::Config;
pub use error::DisciplineError;
pub use latch::LifecycleLatch;
pub use partition::{Partition, PartitionOracle};
pub use rotator::BufferRotator;
pub use timeout::{TimeoutDetector, DEFAULT_TIMEOUT_INACCURACY};
