use crossbeam_channel::Sender;

use std::ops::Deref;

/// Output batch of a discipline.
///
/// In copy mode the batch owns its items. In no-copy mode the batch is a lease of one of the
/// discipline's buffer slots: it has to be given back with `release` (or `into_vec`) before the
/// discipline can reuse that slot.
///
/// Dropping a leased batch without releasing it stalls the discipline: no further batches are
/// produced and its threads never finish.
#[derive(Debug)]
pub struct Batch<I> {
    items: Vec<I>,
    lease: Option<Sender<Vec<I>>>,
}

impl<I> Batch<I> {
    pub(crate) fn owned(items: Vec<I>) -> Batch<I> {
        Batch { items, lease: None }
    }

    pub(crate) fn leased(items: Vec<I>, release: Sender<Vec<I>>) -> Batch<I> {
        Batch {
            items,
            lease: Some(release),
        }
    }

    /// Checks if this batch borrows a buffer slot that has to be released.
    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    /// Items of this batch in input order.
    pub fn as_slice(&self) -> &[I] {
        self.items.as_slice()
    }

    /// Gives the buffer slot back to the discipline.
    ///
    /// Has to be called exactly once for every leased batch. For owned batches this does nothing.
    pub fn release(self) {
        if let Some(release) = self.lease {
            // Transmitter keeps the receiver alive while the lease is out
            let _ = release.send(self.items);
        }
    }

    /// Converts into `Vec` of items.
    ///
    /// A leased batch gives its slot back with a fresh buffer of the same capacity, which
    /// counts as the release.
    pub fn into_vec(mut self) -> Vec<I> {
        match self.lease.take() {
            Some(release) => {
                let items = self.items.split_off(0);
                let _ = release.send(self.items);
                items
            }
            None => self.items,
        }
    }
}

impl<I> Deref for Batch<I> {
    type Target = [I];

    fn deref(&self) -> &[I] {
        self.as_slice()
    }
}

impl<I> AsRef<[I]> for Batch<I> {
    fn as_ref(&self) -> &[I] {
        self.as_slice()
    }
}
