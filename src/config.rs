use crate::error::DisciplineError;
use crate::timeout::{TimeoutDetector, DEFAULT_TIMEOUT_INACCURACY};
use crossbeam_channel::Receiver;

use std::fmt;
use std::time::Duration;

/// Builder of discipline configuration.
///
/// `S` is the element received from the input source: single items for the join discipline,
/// `Vec` batches for the unite discipline.
pub struct Config<S> {
    input: Option<Receiver<S>>,
    join_size: usize,
    no_copy: bool,
    timeout: Duration,
    timeout_inaccuracy: u32,
}

impl<S> fmt::Debug for Config<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("input", &self.input.is_some())
            .field("join_size", &self.join_size)
            .field("no_copy", &self.no_copy)
            .field("timeout", &self.timeout)
            .field("timeout_inaccuracy", &self.timeout_inaccuracy)
            .finish()
    }
}

impl<S> Default for Config<S> {
    fn default() -> Self {
        Config {
            input: None,
            join_size: 0,
            no_copy: false,
            timeout: Duration::ZERO,
            timeout_inaccuracy: DEFAULT_TIMEOUT_INACCURACY,
        }
    }
}

impl<S> Config<S> {
    pub fn new() -> Config<S> {
        Config::default()
    }

    /// Input source; the discipline terminates once all `Sender` ends are dropped.
    pub fn input(mut self, input: Receiver<S>) -> Self {
        self.input = Some(input);
        self
    }

    /// Maximum number of items in an output batch.
    pub fn join_size(mut self, join_size: usize) -> Self {
        self.join_size = join_size;
        self
    }

    /// Hand buffer slots to the consumer instead of copies; every batch then has to be released.
    pub fn no_copy(mut self, no_copy: bool) -> Self {
        self.no_copy = no_copy;
        self
    }

    /// Flush whatever has been accumulated after `timeout` since the last flush.
    /// `Duration::ZERO` (the default) disables timeout flushing.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Precision of timeout detection in percent of the timeout (`1..=100`).
    pub fn timeout_inaccuracy(mut self, percent: u32) -> Self {
        self.timeout_inaccuracy = percent;
        self
    }

    /// Validates configuration splitting it into input source and immutable `Settings`.
    pub(crate) fn normalize(self) -> Result<(Receiver<S>, Settings), DisciplineError> {
        let input = self.input.ok_or(DisciplineError::MissingInput)?;

        if self.join_size == 0 {
            return Err(DisciplineError::InvalidJoinSize);
        }

        let detector = TimeoutDetector::new(self.timeout, self.timeout_inaccuracy)?;

        Ok((
            input,
            Settings {
                join_size: self.join_size,
                no_copy: self.no_copy,
                detector,
            },
        ))
    }
}

/// Validated discipline configuration.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) join_size: usize,
    pub(crate) no_copy: bool,
    pub(crate) detector: TimeoutDetector,
}
