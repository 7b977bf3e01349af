//! Model of the batch boundaries produced by the disciplines.
//!
//! Input of `total` items is assumed to arrive in blocks of `block_size` items (1 for the join
//! discipline, the incoming batch size for the unite discipline). The model predicts the exact
//! sizes of output batches with timeout flushing disabled, and with a single timeout flush
//! forced by a pause in the input.
//!
//! Blocks are joined into groups of `blocks_per_join = join_size / block_size` blocks; the
//! `unused_join` capacity left in a group can absorb a small trailing remainder, which then
//! grows the last batch instead of producing a new one.

/// Batch size model for given block size and join size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionOracle {
    block_size: usize,
    join_size: usize,
}

/// Predicted output of a discipline that received `total` items without interruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    total: usize,
    effective_join: usize,
    unused_join: usize,
}

impl PartitionOracle {
    /// Panics if `block_size` or `join_size` is 0.
    pub fn new(block_size: usize, join_size: usize) -> PartitionOracle {
        assert!(block_size > 0, "PartitionOracle::new bad block_size");
        assert!(join_size > 0, "PartitionOracle::new bad join_size");

        PartitionOracle {
            block_size,
            join_size,
        }
    }

    /// Number of items arriving together.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Maximum output batch size the discipline is configured with.
    pub fn join_size(&self) -> usize {
        self.join_size
    }

    /// Number of whole blocks fitting into a join group; 0 for blocks larger than join size.
    pub fn blocks_per_join(&self) -> usize {
        self.join_size / self.block_size
    }

    /// Largest multiple of block size not exceeding join size, or block size if join size is
    /// smaller.
    pub fn effective_join(&self) -> usize {
        match self.blocks_per_join() {
            0 => self.block_size,
            blocks => blocks * self.block_size,
        }
    }

    /// Join capacity left over in a full group.
    pub fn unused_join(&self) -> usize {
        match self.blocks_per_join() {
            0 => 0,
            _ => self.join_size - self.effective_join(),
        }
    }

    /// Predicts batches for `total` items received without interruption.
    pub fn partition(&self, total: usize) -> Partition {
        Partition {
            total,
            effective_join: self.effective_join(),
            unused_join: self.unused_join(),
        }
    }

    /// Number of items received before a pause at 1-indexed position `pause_at`.
    ///
    /// A pause delays the block containing `pause_at`, so the split falls on the start of
    /// that block.
    pub fn split_point(&self, pause_at: usize) -> usize {
        (pause_at.saturating_sub(1) / self.block_size) * self.block_size
    }

    /// Batch sizes for `total` items with a pause long enough to trigger timeout flush at
    /// `pause_at`.
    ///
    /// Items before and after the split are partitioned independently.
    pub fn interrupted(&self, total: usize, pause_at: usize) -> Vec<usize> {
        let split = self.split_point(pause_at).min(total);

        let mut sizes = self.partition(split).batch_sizes();
        sizes.extend(self.partition(total - split).batch_sizes());
        sizes
    }

    /// Finds the smallest pause position not lower than `estimate` at which the pause forces a
    /// timeout flush that would not otherwise happen.
    ///
    /// Returns `None` if join groups hold fewer than 2 blocks; every block boundary is then also
    /// a batch boundary.
    pub fn pause_position(&self, estimate: usize) -> Option<usize> {
        if self.blocks_per_join() < 2 {
            return None;
        }

        let effective_join = self.effective_join();
        (estimate.max(1)..).find(|&pause_at| self.split_point(pause_at) % effective_join != 0)
    }

    /// Splits `items` into expected output batches, optionally with a pause at `pause_at`.
    pub fn expected<T: Clone>(&self, items: &[T], pause_at: Option<usize>) -> Vec<Vec<T>> {
        let sizes = match pause_at {
            Some(pause_at) => self.interrupted(items.len(), pause_at),
            None => self.partition(items.len()).batch_sizes(),
        };

        let mut rest = items;
        sizes
            .into_iter()
            .map(|size| {
                let (batch, tail) = rest.split_at(size);
                rest = tail;
                batch.to_vec()
            })
            .collect()
    }
}

impl Partition {
    /// Number of items partitioned.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of full join groups, at least 1.
    fn groups(&self) -> usize {
        (self.total / self.effective_join).max(1)
    }

    /// Items left over after full groups; negative when fewer items than one group were given.
    pub fn remainder(&self) -> isize {
        self.total as isize - (self.groups() * self.effective_join) as isize
    }

    /// Checks if the remainder is merged into the last batch rather than emitted on its own.
    ///
    /// A remainder equal to the unused join capacity is still absorbed.
    pub fn remainder_absorbed(&self) -> bool {
        self.remainder() <= self.unused_join as isize
    }

    /// Number of output batches; 0 for no items.
    pub fn batch_count(&self) -> usize {
        if self.total == 0 {
            0
        } else if self.remainder_absorbed() {
            self.groups()
        } else {
            self.groups() + 1
        }
    }

    /// Sizes of output batches in emission order.
    ///
    /// All batches are `effective_join` long except the last one, which either absorbed the
    /// remainder or holds it on its own.
    pub fn batch_sizes(&self) -> Vec<usize> {
        if self.total == 0 {
            return Vec::new();
        }

        let mut sizes = vec![self.effective_join; self.groups()];
        let remainder = self.remainder();
        if self.remainder_absorbed() {
            if let Some(last) = sizes.last_mut() {
                *last = (*last as isize + remainder) as usize;
            }
        } else {
            sizes.push(remainder as usize);
        }
        sizes
    }
}
