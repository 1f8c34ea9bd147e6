//! Bounded FIFO that sheds its oldest entries when full.
//!
//! The microphone produces frames at a fixed rate whether or not the audio
//! line keeps up.  [`LagBuffer`] caps the backlog so the detector always
//! works on recent audio: when it is full, a new frame evicts the oldest
//! one and the eviction is counted.
//!
//! # Example
//!
//! ```rust
//! use buddy_assistant::audio::LagBuffer;
//!
//! let mut buf = LagBuffer::new(2);
//! buf.push(1);
//! buf.push(2);
//! buf.push(3); // evicts 1
//! assert_eq!(buf.pop(), Some(2));
//! assert_eq!(buf.dropped(), 1);
//! ```

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// LagBuffer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LagBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// Total evictions since creation.
    dropped: u64,
}

impl<T> LagBuffer<T> {
    /// A zero `capacity` is clamped to one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append `item`, evicting the oldest entry when full.
    ///
    /// Returns `true` when an entry was evicted.
    pub fn push(&mut self, item: T) -> bool {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front();
            self.dropped += 1;
            true
        } else {
            false
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_within_capacity() {
        let mut buf = LagBuffer::new(4);
        assert!(!buf.push('a'));
        assert!(!buf.push('b'));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.pop(), Some('a'));
        assert_eq!(buf.pop(), Some('b'));
        assert_eq!(buf.pop(), None);
        assert_eq!(buf.dropped(), 0);
    }

    #[test]
    fn overflow_keeps_newest() {
        let mut buf = LagBuffer::new(3);
        for i in 1..=8 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.dropped(), 5);
        let rest: Vec<_> = std::iter::from_fn(|| buf.pop()).collect();
        assert_eq!(rest, vec![6, 7, 8]);
    }

    #[test]
    fn clear_keeps_drop_count() {
        let mut buf = LagBuffer::new(1);
        buf.push(1);
        buf.push(2);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.dropped(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = LagBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(10);
        assert!(buf.push(11));
        assert_eq!(buf.pop(), Some(11));
    }
}
