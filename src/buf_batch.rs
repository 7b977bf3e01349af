use crate::rotator::BufferRotator;
use crossbeam_channel::Receiver;

/// Number of reusable buffer slots; one can be accumulating while the other is in flight.
pub const SLOTS_COUNT: usize = 2;

/// Buffer slot travelling between accumulator, transmitter and consumer together with its index.
#[derive(Debug)]
pub struct Slot<I> {
    pub index: usize,
    pub items: Vec<I>,
}

/// Accumulating buffer backed by a fixed arena of `SLOTS_COUNT` reusable slots.
///
/// The slot being written to is owned here. Slots taken for flushing are owned by whoever
/// received them until they come back over the `recycled` channel, so a slot is never
/// reachable from two places at once.
#[derive(Debug)]
pub struct BufBatch<I> {
    current: Slot<I>,
    // Free slots by index; `None` while slot is away
    spare: Vec<Option<Vec<I>>>,
    rotator: BufferRotator,
    recycled: Receiver<Slot<I>>,
    join_size: usize,
}

impl<I> BufBatch<I> {
    /// Creates buffer with all slots pre-allocated to `join_size` capacity.
    ///
    /// Slots sent away with `take` have to be returned through `recycled`.
    pub fn new(join_size: usize, recycled: Receiver<Slot<I>>) -> BufBatch<I> {
        assert!(join_size > 0, "BufBatch::new bad join_size");

        let rotator = BufferRotator::with_slots(SLOTS_COUNT);
        let spare = (0..SLOTS_COUNT)
            .map(|index| {
                if index == rotator.current() {
                    None
                } else {
                    Some(Vec::with_capacity(join_size))
                }
            })
            .collect();

        BufBatch {
            current: Slot {
                index: rotator.current(),
                items: Vec::with_capacity(join_size),
            },
            spare,
            rotator,
            recycled,
            join_size,
        }
    }

    pub fn join_size(&self) -> usize {
        self.join_size
    }

    pub fn len(&self) -> usize {
        self.current.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.items.is_empty()
    }

    /// Checks if batch has reached `join_size`.
    pub fn is_full(&self) -> bool {
        self.len() >= self.join_size
    }

    /// Checks if `count` more items can be appended without exceeding `join_size`.
    pub fn fits(&self, count: usize) -> bool {
        self.len() + count <= self.join_size
    }

    /// Appends item to current slot.
    ///
    /// Panics if trying to append to a full batch.
    pub fn append(&mut self, item: I) {
        if self.is_full() {
            panic!("BufBatch append on full batch");
        }
        self.current.items.push(item);
    }

    /// Takes current slot out for flushing and rotates to the next one.
    ///
    /// Blocks until the next slot is returned over `recycled`. Returns `None` if the slot is
    /// away and can no longer come back.
    pub fn take(&mut self) -> Option<Slot<I>> {
        let next = self.rotator.advance();
        let items = self.acquire(next)?;
        Some(std::mem::replace(&mut self.current, Slot { index: next, items }))
    }

    fn acquire(&mut self, index: usize) -> Option<Vec<I>> {
        while self.spare[index].is_none() {
            let mut slot = self.recycled.recv().ok()?;
            slot.items.clear();
            self.spare[slot.index] = Some(slot.items);
        }
        self.spare[index].take()
    }
}

impl<I> Extend<I> for BufBatch<I> {
    /// Appends all items to current slot; caller is responsible for checking `fits` first.
    fn extend<T: IntoIterator<Item = I>>(&mut self, iter: T) {
        self.current.items.extend(iter)
    }
}
