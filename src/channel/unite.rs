/*!
This module provides the unite discipline that coalesces already batched input into larger
batches of up to `join_size` items without ever splitting an incoming batch.

Incoming batches are appended to the buffer whole. If an incoming batch does not fit next to
the buffered items, the buffer is flushed first. An incoming batch that alone has `join_size`
or more items is forwarded untouched as its own output batch, after flushing the buffer.

# Example

```rust
use batch_discipline::{Config, Discipline};
use assert_matches::assert_matches;

let config = Config::new().join_size(10);

let batches = Discipline::unite_with_producer_thread(config, 10, |sender| {
    sender.send(vec![1, 2, 3, 4]).unwrap();
    sender.send(vec![5, 6, 7, 8]).unwrap();
    // Does not fit next to 8 buffered items
    sender.send(vec![9, 10, 11]).unwrap();
    // Larger than join size; forwarded whole
    sender.send((12..=23).collect()).unwrap();
    sender.send(vec![24]).unwrap();
}).unwrap();

assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [1, 2, 3, 4, 5, 6, 7, 8]));
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [9, 10, 11]));
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.len(), 12));
assert_matches!(batches.next(), Ok(batch) => assert_eq!(batch.as_slice(), [24]));
assert!(batches.next().is_err());
```
!*/

use super::engine::{Engine, FlushReason};
use super::{Discipline, EndOfStreamError};
use crate::config::Config;
use crate::error::DisciplineError;
use crossbeam_channel::{select, Receiver, Sender};

impl<I: Send + 'static> Discipline<I> {
    /// Starts unite discipline over input source of item batches.
    ///
    /// Returns error without starting any thread if `config` is invalid.
    pub fn unite(config: Config<Vec<I>>) -> Result<Discipline<I>, DisciplineError> {
        let (input, settings) = config.normalize()?;
        Ok(Discipline::launch("unite", input, settings, accumulate))
    }

    /// Starts unite discipline and calls `producer` closure with `Sender` end of a newly created
    /// input source of `channel_size` capacity in a newly started thread.
    ///
    /// Input set in `config` is replaced. The producer thread is started only if `config` is
    /// valid.
    pub fn unite_with_producer_thread(
        config: Config<Vec<I>>,
        channel_size: usize,
        producer: impl FnOnce(Sender<Vec<I>>) + Send + 'static,
    ) -> Result<Discipline<I>, DisciplineError> {
        let (sender, receiver) = crossbeam_channel::bounded(channel_size);
        let discipline = Discipline::unite(config.input(receiver))?;

        std::thread::Builder::new()
            .name("unite producer".to_string())
            .spawn(move || producer(sender))
            .expect("failed to start producer thread");

        Ok(discipline)
    }
}

fn accumulate<I>(input: Receiver<Vec<I>>, mut engine: Engine<I>) {
    let ticker = engine.detector.ticker();

    loop {
        let result = select! {
            recv(input) -> items => match items {
                Ok(items) => append(&mut engine, items),
                Err(_) => break,
            },
            recv(ticker) -> _ => engine.tick(),
        };

        if result.is_err() {
            return;
        }
    }

    engine.close()
}

fn append<I>(engine: &mut Engine<I>, items: Vec<I>) -> Result<(), EndOfStreamError> {
    if items.is_empty() {
        return Ok(());
    }

    if items.len() >= engine.buffer.join_size() {
        engine.flush(FlushReason::Oversize)?;
        return engine.forward(items);
    }

    if !engine.buffer.fits(items.len()) {
        engine.flush(FlushReason::Overflow)?;
    }
    engine.buffer.extend(items);
    if engine.buffer.is_full() {
        engine.flush(FlushReason::Size)?;
    }
    Ok(())
}
