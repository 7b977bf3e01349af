/*!
This module provides the join discipline that groups a stream of single items into batches of
up to `join_size` items.

A batch is flushed when it reaches `join_size` items, when the configured timeout elapses since
the previous flush, or when the input source is exhausted.

# Example

Collect batches of items after reaching the size limit, the timeout and the end of input.

```rust
use batch_discipline::{Config, Discipline};
use std::time::Duration;
use assert_matches::assert_matches;

// Join items into batches of 4 and flush whatever was collected after 200 ms without a flush.
let config = Config::new()
    .join_size(4)
    .timeout(Duration::from_millis(200));

let batches = Discipline::join_with_producer_thread(config, 10, |sender| {
    for item in 1..=6 {
        sender.send(item).unwrap();
    }
    // At this point one batch should be full and two items wait for the next one

    // Introduce delay to trigger the timeout
    std::thread::sleep(Duration::from_millis(600));

    // Last items will be flushed when this thread exits
    sender.send(7).unwrap();
    sender.send(8).unwrap();
}).unwrap();

// Batch flushed due to size limit
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [1, 2, 3, 4]));

// Batch flushed due to timeout
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [5, 6]));

// Batch flushed by exhausted input (producer thread exit)
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [7, 8]));

assert!(batches.next().is_err());
```
!*/

use super::engine::{Engine, FlushReason};
use super::{Discipline, EndOfStreamError};
use crate::config::Config;
use crate::error::DisciplineError;
use crossbeam_channel::{select, Receiver, Sender};

impl<I: Send + 'static> Discipline<I> {
    /// Starts join discipline over input source of single items.
    ///
    /// Returns error without starting any thread if `config` is invalid.
    pub fn join(config: Config<I>) -> Result<Discipline<I>, DisciplineError> {
        let (input, settings) = config.normalize()?;
        Ok(Discipline::launch("join", input, settings, accumulate))
    }

    /// Starts join discipline and calls `producer` closure with `Sender` end of a newly created
    /// input source of `channel_size` capacity in a newly started thread.
    ///
    /// Input set in `config` is replaced. The producer thread is started only if `config` is
    /// valid.
    pub fn join_with_producer_thread(
        config: Config<I>,
        channel_size: usize,
        producer: impl FnOnce(Sender<I>) + Send + 'static,
    ) -> Result<Discipline<I>, DisciplineError> {
        let (sender, receiver) = crossbeam_channel::bounded(channel_size);
        let discipline = Discipline::join(config.input(receiver))?;

        std::thread::Builder::new()
            .name("join producer".to_string())
            .spawn(move || producer(sender))
            .expect("failed to start producer thread");

        Ok(discipline)
    }
}

fn accumulate<I>(input: Receiver<I>, mut engine: Engine<I>) {
    let ticker = engine.detector.ticker();

    loop {
        let result = select! {
            recv(input) -> item => match item {
                Ok(item) => append(&mut engine, item),
                Err(_) => break,
            },
            recv(ticker) -> _ => engine.tick(),
        };

        if result.is_err() {
            // Transmitter gone; nothing more can be delivered
            return;
        }
    }

    engine.close()
}

fn append<I>(engine: &mut Engine<I>, item: I) -> Result<(), EndOfStreamError> {
    engine.buffer.append(item);
    if engine.buffer.is_full() {
        engine.flush(FlushReason::Size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    pub use super::*;
    use crate::partition::PartitionOracle;
    use assert_matches::assert_matches;
    use std::time::{Duration, Instant};

    fn collect(batches: &Discipline<u32>) -> Vec<Vec<u32>> {
        batches.iter().map(|batch| batch.into_vec()).collect()
    }

    #[test]
    fn test_join_max_size() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let batches = Discipline::join(
            Config::new()
                .input(receiver)
                .join_size(5)
                .timeout(Duration::from_secs(60)),
        )
        .unwrap();

        for item in 1..=27 {
            sender.send(item).unwrap();
        }
        drop(sender);

        assert_eq!(
            collect(&batches),
            [
                vec![1, 2, 3, 4, 5],
                vec![6, 7, 8, 9, 10],
                vec![11, 12, 13, 14, 15],
                vec![16, 17, 18, 19, 20],
                vec![21, 22, 23, 24, 25],
                vec![26, 27],
            ]
        );
        assert_matches!(batches.next(), Err(EndOfStreamError));
        assert!(batches.wait_timeout(Duration::from_secs(5)));
        assert!(batches.is_terminated());
    }

    #[test]
    fn test_join_timeout() {
        let batches = Discipline::join_with_producer_thread(
            Config::new()
                .join_size(10)
                .timeout(Duration::from_millis(100)),
            10,
            |sender| {
                sender.send(1).unwrap();
                std::thread::sleep(Duration::from_millis(500));
            },
        )
        .unwrap();

        assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [1])); // timeout
        assert!(!batches.is_terminated()); // check if flush was not because thread has finished
        assert_matches!(batches.next(), Err(EndOfStreamError));
    }

    #[test]
    fn test_join_disconnected() {
        let batches = Discipline::join_with_producer_thread(
            Config::new().join_size(2),
            10,
            |sender| {
                sender.send(1).unwrap();
            },
        )
        .unwrap();

        assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [1])); // disconnected
        assert_matches!(batches.next(), Err(EndOfStreamError));
    }

    #[test]
    fn test_join_empty_input() {
        let batches = Discipline::<u32>::join_with_producer_thread(
            Config::new().join_size(3).timeout(Duration::from_millis(10)),
            10,
            |sender| {
                std::thread::sleep(Duration::from_millis(50));
                drop(sender);
            },
        )
        .unwrap();

        assert_matches!(batches.next(), Err(EndOfStreamError));
    }

    #[test]
    fn test_join_invalid_config() {
        assert_matches!(
            Discipline::<u32>::join(Config::new().join_size(3)),
            Err(DisciplineError::MissingInput)
        );

        let (_sender, receiver) = crossbeam_channel::unbounded::<u32>();
        assert_matches!(
            Discipline::join(Config::new().input(receiver)),
            Err(DisciplineError::InvalidJoinSize)
        );

        assert_matches!(
            Discipline::<u32>::join_with_producer_thread(
                Config::new().join_size(3).timeout_inaccuracy(101),
                1,
                |_sender| panic!("producer started for invalid config"),
            ),
            Err(DisciplineError::InvalidTimeoutInaccuracy(101))
        );
    }

    #[test]
    fn test_join_no_copy_release() {
        let batches = Discipline::join_with_producer_thread(
            Config::new().join_size(2).no_copy(true),
            10,
            |sender| {
                for item in 1..=5 {
                    sender.send(item).unwrap();
                }
            },
        )
        .unwrap();

        let mut seen = Vec::new();
        while let Ok(batch) = batches.next() {
            assert!(batch.is_leased());
            seen.push(batch.to_vec());
            batch.release();
        }

        assert_eq!(seen, [vec![1, 2], vec![3, 4], vec![5]]);
        assert!(batches.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_join_no_copy_stalls_without_release() {
        let batches = Discipline::join_with_producer_thread(
            Config::new().join_size(2).no_copy(true),
            10,
            |sender| {
                for item in 1..=6 {
                    sender.send(item).unwrap();
                }
            },
        )
        .unwrap();

        let first = batches.next().unwrap();
        assert_eq!(first.as_slice(), [1, 2]);

        // Slot is still lent out
        assert_matches!(batches.next_timeout(Duration::from_millis(300)), Ok(None));
        assert!(!batches.is_terminated());

        first.release();
        assert_matches!(batches.next_timeout(Duration::from_secs(5)), Ok(Some(batch)) => {
            assert_eq!(batch.as_slice(), [3, 4]);
            batch.release();
        });
        assert_matches!(batches.next_timeout(Duration::from_secs(5)), Ok(Some(batch)) => {
            assert_eq!(batch.as_slice(), [5, 6]);
            batch.release();
        });
        assert_matches!(batches.next(), Err(EndOfStreamError));
    }

    #[test]
    fn test_join_copy_does_not_wait_for_consumer() {
        let batches = Discipline::join_with_producer_thread(
            Config::new().join_size(2),
            10,
            |sender| {
                for item in 1..=4 {
                    sender.send(item).unwrap();
                }
            },
        )
        .unwrap();

        // Keep first batch while receiving the second one
        let first = batches.next().unwrap();
        assert!(!first.is_leased());
        assert_matches!(batches.next_timeout(Duration::from_secs(5)), Ok(Some(second)) =>
            assert_eq!(second.as_slice(), [3, 4])
        );
        assert_eq!(first.as_slice(), [1, 2]);
    }

    fn run_interrupted(oracle: PartitionOracle, total: u32, pause_at: usize) -> Vec<Vec<u32>> {
        let batches = Discipline::join_with_producer_thread(
            Config::new()
                .join_size(oracle.join_size())
                .timeout(Duration::from_millis(200)),
            20,
            move |sender| {
                for item in 1..=total {
                    if item as usize == pause_at {
                        std::thread::sleep(Duration::from_millis(700));
                    }
                    sender.send(item).unwrap();
                }
            },
        )
        .unwrap();

        collect(&batches)
    }

    #[test]
    fn test_join_interrupted_partition() {
        let oracle = PartitionOracle::new(1, 5);
        let pause_at = oracle.pause_position(3).unwrap();
        assert_eq!(pause_at, 3);

        let items: Vec<u32> = (1..=12).collect();
        assert_eq!(
            run_interrupted(oracle, 12, pause_at),
            oracle.expected(&items, Some(pause_at))
        );
    }

    #[test]
    fn test_join_interrupted_second_group() {
        let oracle = PartitionOracle::new(1, 5);
        // Pause after the first item of the second group
        let pause_at = oracle.pause_position(6).unwrap();
        assert_eq!(pause_at, 7);

        let items: Vec<u32> = (1..=12).collect();
        let expected = oracle.expected(&items, Some(pause_at));
        assert_eq!(expected.iter().map(Vec::len).collect::<Vec<_>>(), [5, 1, 5, 1]);
        assert_eq!(run_interrupted(oracle, 12, pause_at), expected);
    }

    #[test]
    fn test_join_item_after_idle_timeout() {
        // Timeout of 400 ms detected every 40 ms
        let batches = Discipline::join_with_producer_thread(
            Config::new()
                .join_size(10)
                .timeout(Duration::from_millis(400))
                .timeout_inaccuracy(10),
            10,
            |sender| {
                // Timeout has already elapsed with nothing to flush
                std::thread::sleep(Duration::from_millis(470));
                sender.send(Instant::now()).unwrap();
                std::thread::sleep(Duration::from_millis(1000));
            },
        )
        .unwrap();

        assert_matches!(batches.next(), Ok(batch) => {
            assert_eq!(batch.len(), 1);
            // Flushed on the next wake-up rather than a full timeout after arrival
            assert!(batch[0].elapsed() < Duration::from_millis(200));
        });
        assert!(!batches.is_terminated());
        assert_matches!(batches.next(), Err(EndOfStreamError));
    }

    #[test]
    fn test_join_output_dropped() {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let batches = Discipline::join(Config::new().input(receiver).join_size(1)).unwrap();
        drop(batches);

        // Accumulator stops on its next flush; input becomes disconnected
        let mut disconnected = false;
        for item in 0..100u32 {
            if sender.send_timeout(item, Duration::from_secs(5)).is_err() {
                disconnected = true;
                break;
            }
        }
        assert!(disconnected);
    }

    #[test]
    fn test_join_no_copy_output_dropped_with_lease() {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let batches =
            Discipline::join(Config::new().input(receiver).join_size(1).no_copy(true)).unwrap();

        sender.send(0u32).unwrap();
        // Leased batch waits in the output; transmitter waits for its release
        std::thread::sleep(Duration::from_millis(200));
        drop(batches);

        let mut disconnected = false;
        for item in 1..100u32 {
            if sender.send_timeout(item, Duration::from_secs(5)).is_err() {
                disconnected = true;
                break;
            }
        }
        assert!(disconnected);
    }
}
