//! Circular Buffer Implementation

use std::collections::VecDeque;

/// Fixed-capacity FIFO ring buffer
///
/// Enqueuing into a full buffer evicts the oldest element. Owned by a single
/// session, so no interior synchronisation is needed.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    /// Buffered elements, oldest first
    storage: VecDeque<T>,
    /// Capacity of the buffer
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    /// Create a new circular buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an element (evicts the oldest if full)
    pub fn enqueue(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.storage.len() == self.capacity {
            self.storage.pop_front();
        }
        self.storage.push_back(value);
    }

    /// Remove and return the oldest element
    pub fn dequeue(&mut self) -> Option<T> {
        self.storage.pop_front()
    }

    /// Number of elements currently in the buffer
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.storage.len() == self.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Element at `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        self.storage.get(index)
    }

    /// Most recently enqueued element
    pub fn last(&self) -> Option<&T> {
        self.storage.back()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.storage.iter()
    }

    /// Fold all elements left-to-right, `None` on an empty buffer
    pub fn reduce<F>(&self, f: F) -> Option<T>
    where
        T: Clone,
        F: FnMut(T, T) -> T,
    {
        self.storage.iter().cloned().reduce(f)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut buffer = CircularBuffer::new(10);

        for i in 0..5 {
            buffer.enqueue(i * 100);
        }

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.get(0), Some(&0));
        assert_eq!(buffer.last(), Some(&400)); // Most recent
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = CircularBuffer::new(3);

        for i in 0..4 {
            buffer.enqueue(i);
        }

        assert_eq!(buffer.len(), 3);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dequeue_empty() {
        let mut buffer: CircularBuffer<u32> = CircularBuffer::new(2);
        assert_eq!(buffer.dequeue(), None);

        buffer.enqueue(7);
        buffer.enqueue(8);
        assert_eq!(buffer.dequeue(), Some(7));
        assert_eq!(buffer.dequeue(), Some(8));
        assert_eq!(buffer.dequeue(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reduce() {
        let mut buffer = CircularBuffer::new(4);
        assert_eq!(buffer.reduce(|a: f64, b| a + b), None);

        buffer.enqueue(1.0);
        assert_eq!(buffer.reduce(|a, b| a + b), Some(1.0));

        buffer.enqueue(2.0);
        buffer.enqueue(3.5);
        assert_eq!(buffer.reduce(|a, b| a + b), Some(6.5));
    }

    proptest! {
        #[test]
        fn retains_most_recent_in_order(capacity in 1usize..16, extra in 0usize..16) {
            let mut buffer = CircularBuffer::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                buffer.enqueue(i);
            }
            let kept: Vec<usize> = buffer.iter().copied().collect();
            let expected: Vec<usize> = (total - capacity..total).collect();
            prop_assert_eq!(kept, expected);
            prop_assert!(buffer.is_full());
        }
    }
}
