/// Cycles an index over the inclusive range `begin..=end`.
///
/// Advancing past `end` wraps back to `begin`. A degenerate range (`end <= begin`) keeps the
/// index at `begin` forever.
#[derive(Debug, Clone)]
pub struct BufferRotator {
    begin: usize,
    end: usize,
    current: usize,
}

impl BufferRotator {
    /// Creates rotator positioned at `begin`.
    pub fn new(begin: usize, end: usize) -> BufferRotator {
        BufferRotator {
            begin,
            end,
            current: begin,
        }
    }

    /// Creates rotator over `count` slots starting at index 0.
    pub fn with_slots(count: usize) -> BufferRotator {
        BufferRotator::new(0, count.saturating_sub(1))
    }

    /// Index the rotator is positioned at.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Moves to the next index and returns it.
    pub fn advance(&mut self) -> usize {
        if self.end > self.begin {
            self.current = if self.current >= self.end {
                self.begin
            } else {
                self.current + 1
            };
        }
        self.current
    }
}
