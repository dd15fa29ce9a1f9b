//! Fixed-capacity byte ring: the elastic cushion between input arrival and
//! paced emission.

use ringbuf::{traits::*, HeapRb};

/// Ring of pending bytes.
///
/// Push never fails: when the ring is full the oldest byte is evicted,
/// because the cushion approximates the in-flight stream rather than acting
/// as a lossless queue. Pop never blocks: `None` marks an empty ring and
/// doubles as the end-of-stream sentinel during drain.
///
/// Single-threaded access only; the engine owns the ring exclusively.
pub struct DelayRing {
    rb: HeapRb<u8>,
}

impl DelayRing {
    /// Capacity used by the engine unless configured otherwise.
    pub const DEFAULT_CAPACITY: usize = 2048;

    /// Create a ring holding up to `capacity` bytes. `capacity` must be at
    /// least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            rb: HeapRb::new(capacity),
        }
    }

    /// Buffer one byte, evicting the oldest when full.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.rb.push_overwrite(byte);
    }

    /// Oldest buffered byte, or `None` when the ring is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        self.rb.try_pop()
    }

    pub fn len(&self) -> usize {
        self.rb.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.rb.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rb.capacity().get()
    }
}

impl Default for DelayRing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
